use obe_core::{ErrorInfo, Measurement, ObeError, Tensor};

#[test]
fn error_round_trip_json() {
    let err = ObeError::Protocol(
        ErrorInfo::new("protocol.unknown_command", "unknown command")
            .with_context("command", "bogus"),
    );
    let json = serde_json::to_value(&err).expect("serialize");
    assert_eq!(json["family"], "protocol");
    assert_eq!(json["detail"]["code"], "protocol.unknown_command");
    assert!(json["detail"].get("hint").is_none());

    let decoded: ObeError = serde_json::from_value(json).expect("deserialize");
    assert_eq!(decoded, err);
}

#[test]
fn measurement_round_trip_json() {
    let m = Measurement::new(vec![0.6], vec![0.8], vec![0.05]).expect("measurement");
    let json = serde_json::to_string(&m).expect("serialize");
    let decoded: Measurement = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, m);
}

#[test]
fn measurement_rejects_bad_records() {
    assert!(Measurement::new(vec![], vec![1.0], vec![1.0]).is_err());
    assert!(Measurement::new(vec![0.1], vec![1.0, 2.0], vec![1.0]).is_err());
    assert!(Measurement::new(vec![0.1], vec![1.0], vec![0.0]).is_err());
}

#[test]
fn tensor_shape_is_checked() {
    assert!(Tensor::new(vec![2, 2], vec![1.0; 3]).is_err());
    let rows = Tensor::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).expect("rows");
    assert_eq!(rows.shape(), &[2, 2]);
    assert!(Tensor::from_rows(&[vec![1.0], vec![1.0, 2.0]]).is_err());
    assert_eq!(Tensor::scalar(2.5).to_nested(), serde_json::json!(2.5));
}

use std::fs;

use obe_server::{AxisSpec, NewRunAction, ServerConfig};
use tempfile::tempdir;

const LINE_CONFIG: &str = r#"
[server]
address = "0.0.0.0"
port = 7000
read_timeout_secs = 30
on_newrun = "rebind"

[model]
name = "line"

[[settings]]
name = "x"
values = [0.0, 0.5, 1.0]

[[parameters]]
name = "m"
start = -1.0
stop = 1.0
steps = 21

[[parameters]]
name = "b"
start = 0.0
stop = 1.0
steps = 11

[engine]
n_particles = 300
seed = 42
"#;

#[test]
fn defaults_describe_the_lorentzian_demo() {
    let config = ServerConfig::default();
    config.validate().unwrap();
    assert_eq!(config.bind_address(), "127.0.0.1:61981");
    let args = config.engine_args().unwrap();
    let lengths: Vec<usize> = args.parameter_axes.iter().map(Vec::len).collect();
    assert_eq!(args.setting_axes[0].len(), 101);
    assert_eq!(lengths, vec![41, 50]);
    assert_eq!(args.constants, vec![1.0]);
}

#[test]
fn loads_a_file_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("server.toml");
    fs::write(&path, LINE_CONFIG).unwrap();

    let config = ServerConfig::load(&path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.bind_address(), "0.0.0.0:7000");
    assert_eq!(config.server.on_newrun, NewRunAction::Rebind);
    assert_eq!(config.read_timeout().unwrap().as_secs(), 30);
    assert_eq!(config.engine.n_particles, 300);
    assert_eq!(config.engine.default_pickiness, 15);
    let args = config.engine_args().unwrap();
    assert_eq!(args.parameter_axes[0].len(), 21);
    assert!(args.constants.is_empty());
}

#[test]
fn empty_file_yields_defaults() {
    let config = ServerConfig::from_toml_str("").unwrap();
    assert_eq!(config, ServerConfig::default());
}

#[test]
fn printed_config_parses_back() {
    let config = ServerConfig::from_toml_str(LINE_CONFIG).unwrap();
    let text = config.to_toml_string().unwrap();
    assert_eq!(ServerConfig::from_toml_str(&text).unwrap(), config);
}

#[test]
fn fingerprint_tracks_content() {
    let a = ServerConfig::default();
    let mut b = ServerConfig::default();
    assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    assert_eq!(a.fingerprint().unwrap().len(), 64);
    b.engine.seed = 1;
    assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
}

#[test]
fn invalid_configurations_are_rejected() {
    let mut wrong_model = ServerConfig::default();
    wrong_model.model.name = "cubic".into();
    assert_eq!(wrong_model.validate().unwrap_err().info().code, "config.unknown_model");

    let mut wrong_arity = ServerConfig::default();
    wrong_arity.model.constants.clear();
    assert_eq!(wrong_arity.validate().unwrap_err().info().code, "config.model_arity");

    let mut ambiguous = ServerConfig::default();
    ambiguous.settings[0].values = Some(vec![0.0, 1.0]);
    assert_eq!(ambiguous.validate().unwrap_err().info().code, "config.axis_ambiguous");

    let mut empty_axis = ServerConfig::default();
    empty_axis.settings = vec![AxisSpec::values("x", Vec::new())];
    assert_eq!(empty_axis.validate().unwrap_err().info().code, "grid.empty_axis");

    let mut no_timeout = ServerConfig::default();
    no_timeout.server.read_timeout_secs = Some(0);
    assert_eq!(no_timeout.validate().unwrap_err().family(), "configuration");

    let mut engine = ServerConfig::default();
    engine.engine.n_particles = 0;
    assert_eq!(engine.validate().unwrap_err().info().code, "engine.n_particles");
}

#[test]
fn missing_file_and_bad_syntax_are_serde_errors() {
    let dir = tempdir().unwrap();
    let missing = ServerConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert_eq!(missing.info().code, "config.read");

    let path = dir.path().join("broken.toml");
    fs::write(&path, "[server\nport = ").unwrap();
    let broken = ServerConfig::load(&path).unwrap_err();
    assert_eq!(broken.family(), "serde");
    assert!(broken.info().context.contains_key("path"));
}

#[test]
fn engine_args_check_model_arity() {
    let mut config = ServerConfig::default();
    config.model.constants.clear();
    assert_eq!(config.engine_args().unwrap_err().info().code, "config.model_arity");
}

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn slidepress(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_slidepress"))
        .args(args)
        .env("HOME", home)
        .output()
        .expect("run slidepress")
}

fn write_deck(dir: &Path, name: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, "# Title\n\n---\n\n## Second").expect("write deck");
    path.to_str().unwrap().to_string()
}

#[test]
fn html_conversion_exits_zero_and_writes_artifact() {
    let dir = TempDir::new().expect("tempdir");
    let deck = write_deck(dir.path(), "deck.md");

    let output = slidepress(dir.path(), &[&deck]);

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let html = std::fs::read_to_string(dir.path().join("deck.html")).expect("html output");
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert_eq!(html.matches("<section").count(), 2);
}

#[test]
fn named_output_with_multiple_inputs_exits_two() {
    let dir = TempDir::new().expect("tempdir");
    let a = write_deck(dir.path(), "a.md");
    let b = write_deck(dir.path(), "b.md");
    let out = dir.path().join("slides.html");

    let output = slidepress(dir.path(), &[&a, &b, "-o", out.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    assert!(!out.exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Output path cannot be specified"), "{stderr}");
}

#[test]
fn unknown_template_exits_two() {
    let dir = TempDir::new().expect("tempdir");
    let deck = write_deck(dir.path(), "deck.md");

    let output = slidepress(dir.path(), &[&deck, "--template", "fancy"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(!dir.path().join("deck.html").exists());
}

#[test]
fn missing_input_fails_the_batch_with_exit_one() {
    let dir = TempDir::new().expect("tempdir");
    let deck = write_deck(dir.path(), "deck.md");
    let missing = dir.path().join("missing.md");

    let output = slidepress(dir.path(), &[missing.to_str().unwrap(), &deck]);

    assert_eq!(output.status.code(), Some(1));
    assert!(dir.path().join("deck.html").exists());
}

#[test]
fn config_flag_is_applied() {
    let dir = TempDir::new().expect("tempdir");
    let deck = write_deck(dir.path(), "deck.md");
    let cfg_path = dir.path().join("slidepress.toml");
    std::fs::write(&cfg_path, "template = \"bare\"\nlang = \"fr\"\n").expect("write config");

    let output = slidepress(dir.path(), &[&deck, "--config", cfg_path.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let html = std::fs::read_to_string(dir.path().join("deck.html")).expect("html output");
    assert!(html.contains("<html lang=\"fr\">"));
}

#[test]
fn invalid_config_exits_two() {
    let dir = TempDir::new().expect("tempdir");
    let deck = write_deck(dir.path(), "deck.md");
    let cfg_path = dir.path().join("slidepress.toml");
    std::fs::write(&cfg_path, "jpeg_quality = 0\n").expect("write config");

    let output = slidepress(dir.path(), &[&deck, "--config", cfg_path.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
}

mod common;

use assert_cmd::Command;
use common::{create_temp_directory, write_fake_image, write_png, write_tuning_file, SMALL_TUNING};
use predicates::prelude::*;

fn sizelock() -> Command {
    Command::cargo_bin("sizelock").unwrap()
}

#[test]
fn test_cli_help() {
    sizelock().arg("--help").assert().success();
}

#[test]
fn test_subcommand_help() {
    for sub in ["lock", "batch", "info"] {
        sizelock().args([sub, "--help"]).assert().success();
    }
}

#[test]
fn test_lock_missing_args() {
    sizelock().arg("lock").assert().failure();
}

#[test]
fn test_lock_nonexistent_file() {
    sizelock()
        .args(["lock", "nonexistent.png", "output.jpg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_lock_rejects_inverted_range() {
    let temp_dir = create_temp_directory();
    let input = temp_dir.path().join("in.png");
    write_png(&input, 32, 32);

    sizelock()
        .args(["lock", &input.to_string_lossy(), "out.jpg"])
        .args(["--min-bytes", "3MiB", "--max-bytes", "1MiB"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid target range"));
}

#[test]
fn test_lock_rejects_undecodable_input() {
    let temp_dir = create_temp_directory();
    let input = temp_dir.path().join("fake.jpg");
    let output = temp_dir.path().join("out.jpg");
    write_fake_image(&input);

    sizelock()
        .args(["lock", &input.to_string_lossy(), &output.to_string_lossy()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid source image"));
    assert!(!output.exists());
}

#[test]
fn test_lock_converges_with_small_tuning() {
    let temp_dir = create_temp_directory();
    let input = temp_dir.path().join("in.png");
    let output = temp_dir.path().join("out.jpg");
    let tuning = write_tuning_file(temp_dir.path(), SMALL_TUNING);
    write_png(&input, 48, 36);

    sizelock()
        .args(["lock", &input.to_string_lossy(), &output.to_string_lossy()])
        .args(["--config", &tuning.to_string_lossy()])
        .args(["--min-bytes", "1", "--max-bytes", "10MiB"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Size lock complete"));

    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!(decoded.width(), 64);
    assert_eq!(decoded.height(), 48);
}

#[test]
fn test_lock_quiet_leaves_stdout_empty() {
    let temp_dir = create_temp_directory();
    let input = temp_dir.path().join("in.png");
    let output = temp_dir.path().join("out.jpg");
    let tuning = write_tuning_file(temp_dir.path(), SMALL_TUNING);
    write_png(&input, 48, 36);

    sizelock()
        .arg("-q")
        .args(["lock", &input.to_string_lossy(), &output.to_string_lossy()])
        .args(["--config", &tuning.to_string_lossy()])
        .args(["--min-bytes", "1", "--max-bytes", "10MiB"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert!(output.exists());
}

#[test]
fn test_quiet_still_reports_errors() {
    sizelock()
        .args(["-q", "lock", "nonexistent.png", "output.jpg"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_lock_reports_convergence_failure() {
    let temp_dir = create_temp_directory();
    let input = temp_dir.path().join("in.png");
    let output = temp_dir.path().join("out.jpg");
    let tuning = write_tuning_file(temp_dir.path(), SMALL_TUNING);
    write_png(&input, 32, 32);

    sizelock()
        .args(["lock", &input.to_string_lossy(), &output.to_string_lossy()])
        .args(["--config", &tuning.to_string_lossy()])
        .args(["--min-bytes", "1GiB", "--max-bytes", "2GiB", "--max-iterations", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("size lock failed after 3 attempts"));
    assert!(!output.exists());
}

#[test]
fn test_lock_zero_iterations_fails() {
    let temp_dir = create_temp_directory();
    let input = temp_dir.path().join("in.png");
    write_png(&input, 16, 16);

    sizelock()
        .args(["lock", &input.to_string_lossy(), "never.jpg"])
        .args(["--max-iterations", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("size lock failed after 0 attempts"));
}

#[test]
fn test_lock_rejects_bad_tuning_file() {
    let temp_dir = create_temp_directory();
    let input = temp_dir.path().join("in.png");
    let tuning = write_tuning_file(temp_dir.path(), "quality_floor = 99\n");
    write_png(&input, 16, 16);

    sizelock()
        .args(["lock", &input.to_string_lossy(), "out.jpg"])
        .args(["--config", &tuning.to_string_lossy()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid tuning configuration"));
}

#[test]
fn test_batch_missing_args() {
    sizelock().arg("batch").assert().failure();
}

#[test]
fn test_batch_empty_directory() {
    let temp_dir = create_temp_directory();
    let output_dir = temp_dir.path().join("output");

    sizelock()
        .args(["batch", &temp_dir.path().to_string_lossy(), &output_dir.to_string_lossy()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No image files found"));
}

#[test]
fn test_batch_locks_directory() {
    let temp_dir = create_temp_directory();
    let input_dir = temp_dir.path().join("renders");
    let output_dir = temp_dir.path().join("catalog");
    std::fs::create_dir(&input_dir).unwrap();
    write_png(&input_dir.join("a.png"), 40, 30);
    write_png(&input_dir.join("b.png"), 30, 40);
    let tuning = write_tuning_file(temp_dir.path(), SMALL_TUNING);

    sizelock()
        .args(["batch", &input_dir.to_string_lossy(), &output_dir.to_string_lossy()])
        .args(["--config", &tuning.to_string_lossy()])
        .args(["--min-bytes", "1", "--max-bytes", "10MiB", "-j", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Files locked: 2"));

    assert!(output_dir.join("a.jpg").exists());
    assert!(output_dir.join("b.jpg").exists());
}

#[test]
fn test_batch_fails_when_any_file_fails() {
    let temp_dir = create_temp_directory();
    let input_dir = temp_dir.path().join("renders");
    std::fs::create_dir(&input_dir).unwrap();
    write_fake_image(&input_dir.join("broken.jpg"));

    sizelock()
        .args([
            "batch",
            &input_dir.to_string_lossy(),
            &temp_dir.path().join("out").to_string_lossy(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 of 1 files failed"));
}

#[test]
fn test_batch_refuses_to_overwrite_shared_stem() {
    let temp_dir = create_temp_directory();
    let input_dir = temp_dir.path().join("renders");
    let output_dir = temp_dir.path().join("catalog");
    std::fs::create_dir(&input_dir).unwrap();
    write_png(&input_dir.join("a.png"), 40, 30);
    write_png(&input_dir.join("a.jpg"), 30, 40);
    let tuning = write_tuning_file(temp_dir.path(), SMALL_TUNING);

    sizelock()
        .args(["batch", &input_dir.to_string_lossy(), &output_dir.to_string_lossy()])
        .args(["--config", &tuning.to_string_lossy()])
        .args(["--min-bytes", "1", "--max-bytes", "10MiB"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 of 2 files failed"));

    assert_eq!(std::fs::read_dir(&output_dir).unwrap().count(), 1);
}

#[test]
fn test_info_missing_args() {
    sizelock().arg("info").assert().failure();
}

#[test]
fn test_info_nonexistent_file() {
    sizelock().args(["info", "nonexistent.jpg"]).assert().failure();
}

#[test]
fn test_info_reports_dimensions() {
    let temp_dir = create_temp_directory();
    let input = temp_dir.path().join("in.png");
    write_png(&input, 24, 12);

    sizelock()
        .args(["info", &input.to_string_lossy()])
        .assert()
        .success()
        .stdout(predicate::str::contains("24x12 pixels"))
        .stdout(predicate::str::contains("Aspect ratio: 2.00:1"));
}

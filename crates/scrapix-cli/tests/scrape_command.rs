use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

#[allow(deprecated)]
fn get_scrapix_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("scrapix")
}

#[test]
fn test_scrape_help_lists_the_tunables() {
    let mut cmd = Command::new(get_scrapix_bin());
    cmd.arg("scrape").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--limit"))
        .stdout(predicate::str::contains("--skip"))
        .stdout(predicate::str::contains("--exclude"))
        .stdout(predicate::str::contains("--min-res"))
        .stdout(predicate::str::contains("--max-res"))
        .stdout(predicate::str::contains("--download"))
        .stdout(predicate::str::contains("--force"))
        .stdout(predicate::str::contains("--tile-selector"))
        .stdout(predicate::str::contains("--image-selector"))
        .stdout(predicate::str::contains("SCRAPIX_TILE_SELECTOR"));
}

#[test]
fn test_scrape_requires_a_query() {
    let mut cmd = Command::new(get_scrapix_bin());
    cmd.arg("scrape");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("QUERY"));
}

#[test]
fn test_scrape_rejects_malformed_resolution() {
    let mut cmd = Command::new(get_scrapix_bin());
    cmd.arg("scrape").arg("tanks").arg("--min-res").arg("banana");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("expected WIDTHxHEIGHT"));
}

#[test]
fn test_top_level_help_names_subcommands() {
    let mut cmd = Command::new(get_scrapix_bin());
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("scrape"))
        .stdout(predicate::str::contains("completion"));
}

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const DOCUMENT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<SearchConfiguration>
  <CrawledProperties>
    <Category Name="SharePoint">
      <CrawledProperty Name="ows_Author" PropSetId="00000000-0000-0000-0000-000000000000" VariantType="31"/>
    </Category>
  </CrawledProperties>
  <ManagedProperties>
    <remove Name="Obsolete"/>
    <ManagedProperty Name="Author" Type="Text">
      <Map Category="SharePoint">ows_Author</Map>
    </ManagedProperty>
  </ManagedProperties>
  <ContentSources>
    <ContentSource Name="Intranet" Type="Web" StartFullCrawl="true">
      <StartAddress Url="{sitecollection}/"/>
    </ContentSource>
  </ContentSources>
</SearchConfiguration>
"#;

const STATE: &str = r#"{ "categories": { "SharePoint": [] } }"#;

fn searchsync() -> Command {
    let mut cmd = Command::cargo_bin("searchsync").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("SEARCHSYNC_LOG");
    cmd
}

fn setup(dir: &Path) {
    fs::write(dir.join("SearchConfiguration.xml"), DOCUMENT).unwrap();
    fs::write(dir.join("searchsync-state.json"), STATE).unwrap();
}

fn read_state(dir: &Path) -> serde_json::Value {
    let content = fs::read_to_string(dir.join("searchsync-state.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[test]
fn test_help_and_version() {
    searchsync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("declarative search configuration"));

    searchsync().arg("--version").assert().success();
}

#[test]
fn test_apply_and_rerun() {
    let temp_dir = TempDir::new().unwrap();
    setup(temp_dir.path());

    searchsync()
        .current_dir(temp_dir.path())
        .args(["apply", "--site", "http://portal/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("crawled +1 -0"))
        .stdout(predicate::str::contains("content sources +1 -0, crawls 1"))
        .stderr(predicate::str::contains("Managed property \"Obsolete\" was not found."));

    let state = read_state(temp_dir.path());
    assert_eq!(state["categories"]["SharePoint"][0]["name"], "ows_Author");
    assert_eq!(state["managedProperties"][0]["name"], "Author");
    assert_eq!(
        state["managedProperties"][0]["mappings"][0]["crawledPropertyName"],
        "ows_Author"
    );
    assert_eq!(
        state["contentSources"][0]["startAddresses"][0],
        "http://portal//"
    );

    searchsync()
        .current_dir(temp_dir.path())
        .args(["apply", "--site", "http://portal/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to do."))
        .stderr(predicate::str::contains("will not be created as it already exists"));
}

#[test]
fn test_dry_run_leaves_state_untouched() {
    let temp_dir = TempDir::new().unwrap();
    setup(temp_dir.path());

    searchsync()
        .current_dir(temp_dir.path())
        .args(["metadata", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("managed +1 -0"));

    let content = fs::read_to_string(temp_dir.path().join("searchsync-state.json")).unwrap();
    assert_eq!(content, STATE);
}

#[test]
fn test_missing_site_context_fails() {
    let temp_dir = TempDir::new().unwrap();
    setup(temp_dir.path());

    searchsync()
        .current_dir(temp_dir.path())
        .arg("content-sources")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no site context was supplied"));
}

#[test]
fn test_settings_file_supplies_paths_and_site() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join("config");
    fs::create_dir(&config_dir).unwrap();
    fs::write(config_dir.join("search.xml"), DOCUMENT).unwrap();
    fs::write(config_dir.join("state.json"), STATE).unwrap();
    fs::write(
        temp_dir.path().join(".searchsync.toml"),
        "document = \"config/search.xml\"\nstate = \"config/state.json\"\nsite_url = \"http://settings/\"\n",
    )
    .unwrap();

    searchsync()
        .current_dir(temp_dir.path())
        .arg("content-sources")
        .assert()
        .success();

    let content = fs::read_to_string(config_dir.join("state.json")).unwrap();
    assert!(content.contains("http://settings//"));
}

#[test]
fn test_show_prints_directives() {
    let temp_dir = TempDir::new().unwrap();
    setup(temp_dir.path());

    searchsync()
        .current_dir(temp_dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ows_Author\""))
        .stdout(predicate::str::contains("\"Intranet\""));
}

#[test]
fn test_invalid_document_fails() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("SearchConfiguration.xml"), "<Other/>").unwrap();

    searchsync()
        .current_dir(temp_dir.path())
        .arg("apply")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Expected <SearchConfiguration> as root element"));
}

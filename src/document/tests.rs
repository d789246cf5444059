use super::*;
use std::fs;
use tempfile::TempDir;

const AGENT_CONF: &str = r#"<ossec_config>
  <client>
    <server>
      <address>10.0.0.5</address>
      <port>1514</port>
      <protocol>tcp</protocol>
    </server>
    <config-profile>darwin, darwin23</config-profile>
  </client>
  <syscheck>
    <disabled>no</disabled>
  </syscheck>
</ossec_config>
"#;

fn record() -> AuditRecord {
    AuditRecord::builder()
        .timestamp("2024-04-07T10:11:12")
        .build()
}

fn write_doc(contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ossec.conf");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn test_extract_agent_conf() {
    let endpoint = extract(AGENT_CONF).unwrap();
    assert_eq!(endpoint.address(), "10.0.0.5");
    assert_eq!(endpoint.port(), 1514);
}

#[test]
fn test_extract_ignores_surrounding_markup() {
    let doc = "junk <a>b</a>\n<address>\n   manager.local\n</address>noise<port> 443 </port>";
    let endpoint = extract(doc).unwrap();
    assert_eq!(endpoint.address(), "manager.local");
    assert_eq!(endpoint.port(), 443);
}

#[test]
fn test_extract_first_occurrence_wins() {
    let doc = r#"<ossec_config>
  <port>1514</port>
  <server><address>10.0.0.5</address></server>
  <server><address>10.9.9.9</address><port>9999</port></server>
</ossec_config>"#;
    let endpoint = extract(doc).unwrap();
    assert_eq!(endpoint.address(), "10.0.0.5");
    assert_eq!(endpoint.port(), 1514);
}

#[test]
fn test_extract_strips_nested_markup() {
    let doc = "<address><![CDATA[]]><b>10.0.0.5</b></address><port>1514</port>";
    assert_eq!(extract(doc).unwrap().address(), "10.0.0.5");
}

#[test]
fn test_extract_stops_at_closing_marker() {
    let doc = "<ossec_config><address>10.0.0.5</address></ossec_config>\n<port>1514</port>";
    assert!(matches!(
        extract(doc),
        Err(DocumentError::FieldNotFound { field }) if field == "port"
    ));
}

#[test]
fn test_extract_missing_fields() {
    let doc = AGENT_CONF.replace("<port>1514</port>", "");
    assert!(matches!(
        extract(&doc),
        Err(DocumentError::FieldNotFound { field }) if field == "port"
    ));

    let doc = AGENT_CONF.replace("<address>10.0.0.5</address>", "");
    assert!(matches!(
        extract(&doc),
        Err(DocumentError::FieldNotFound { field }) if field == "address"
    ));

    // An unterminated field does not count
    assert!(matches!(
        extract("<address>10.0.0.5<port>1514</port>"),
        Err(DocumentError::FieldNotFound { .. })
    ));
}

#[test]
fn test_extract_malformed_port() {
    let doc = AGENT_CONF.replace("<port>1514</port>", "<port>70000</port>");
    assert!(matches!(
        extract(&doc),
        Err(DocumentError::MalformedPort { value, .. }) if value == "70000"
    ));
}

#[test]
fn test_load_missing_document() {
    let dir = TempDir::new().unwrap();
    let result = ConfigDocument::load(dir.path().join("missing.conf"));
    assert!(matches!(result, Err(DocumentError::Read { .. })));
}

#[test]
fn test_load_does_not_mutate() {
    let doc = AGENT_CONF.replace("<port>1514</port>", "");
    let (_dir, path) = write_doc(&doc);

    let loaded = ConfigDocument::load(&path).unwrap();
    assert!(loaded.endpoint().is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), doc);
}

#[test]
fn test_stamp_only_inserts_block() {
    let stamped = stamp(AGENT_CONF, &record()).unwrap();
    let block = "\n<labels>\n  <label key=\"isolated.time\">2024-04-07T10:11:12</label>\n</labels>\n";

    let at = AGENT_CONF.find(CLOSING_MARKER).unwrap();
    assert_eq!(&stamped[..at], &AGENT_CONF[..at]);
    assert_eq!(&stamped[at..at + block.len()], block);
    assert_eq!(&stamped[at + block.len()..], &AGENT_CONF[at..]);
    assert_eq!(stamped.replacen(block, "", 1), AGENT_CONF);
}

#[test]
fn test_stamp_twice_appends_twice() {
    let once = stamp(AGENT_CONF, &record()).unwrap();
    let twice = stamp(&once, &record()).unwrap();
    assert_eq!(twice.matches("<labels>").count(), 2);
    assert_eq!(twice.matches("isolated.time").count(), 2);
}

#[test]
fn test_stamp_custom_key() {
    let stamped = stamp(AGENT_CONF, &record().with_key("isolation.started")).unwrap();
    assert!(stamped.contains(r#"<label key="isolation.started">2024-04-07T10:11:12</label>"#));
}

#[test]
fn test_stamp_marker_errors() {
    let doc = AGENT_CONF.replace(CLOSING_MARKER, "");
    assert!(matches!(
        stamp(&doc, &record()),
        Err(DocumentError::MarkerNotFound { .. })
    ));

    let doc = format!("{}{}", AGENT_CONF, AGENT_CONF);
    assert!(matches!(
        stamp(&doc, &record()),
        Err(DocumentError::MarkerNotUnique { count: 2, .. })
    ));
}

#[test]
fn test_document_stamp_persists() {
    let (_dir, path) = write_doc(AGENT_CONF);

    let mut doc = ConfigDocument::load(&path).unwrap();
    doc.stamp(&record()).unwrap();

    let on_disk = fs::read_to_string(&path).unwrap();
    assert_eq!(on_disk, doc.content());
    assert_eq!(on_disk.matches("<labels>").count(), 1);
}

#[test]
fn test_document_stamp_without_marker_leaves_file() {
    let original = AGENT_CONF.replace(CLOSING_MARKER, "");
    let (_dir, path) = write_doc(&original);

    let mut doc = ConfigDocument::load(&path).unwrap();
    assert!(matches!(
        doc.stamp(&record()),
        Err(DocumentError::MarkerNotFound { .. })
    ));
    assert_eq!(fs::read_to_string(&path).unwrap(), original);
    assert_eq!(doc.content(), original);
}

#[test]
fn test_write_atomic_failure_leaves_no_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing-dir").join("ossec.conf");

    assert!(matches!(
        write_atomic(&path, "data"),
        Err(DocumentError::Write { .. })
    ));
    assert!(!path.exists());
}

#[test]
fn test_document_write_failure_keeps_existing_file() {
    let dir = TempDir::new().unwrap();
    let etc = dir.path().join("etc");
    fs::create_dir(&etc).unwrap();
    let path = etc.join("ossec.conf");
    fs::write(&path, AGENT_CONF).unwrap();

    let mut doc = ConfigDocument::load(&path).unwrap();

    // Swap the parent for a regular file so the temp file cannot be created
    let moved = dir.path().join("etc.moved");
    fs::rename(&etc, &moved).unwrap();
    fs::write(&etc, "not a directory").unwrap();

    assert!(matches!(
        doc.stamp(&record()),
        Err(DocumentError::Write { .. })
    ));
    assert_eq!(doc.content(), AGENT_CONF);
    assert_eq!(fs::read_to_string(moved.join("ossec.conf")).unwrap(), AGENT_CONF);
    assert_eq!(fs::read_dir(&moved).unwrap().count(), 1);

    // Writing through the document itself as a parent fails the same way
    let existing = moved.join("ossec.conf");
    assert!(matches!(
        write_atomic(&existing.join("ossec.conf"), "data"),
        Err(DocumentError::Write { .. })
    ));
    assert_eq!(fs::read_to_string(&existing).unwrap(), AGENT_CONF);
}

#[cfg(unix)]
#[test]
fn test_write_atomic_keeps_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let (dir, path) = write_doc(AGENT_CONF);
    fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

    write_atomic(&path, "replaced").unwrap();

    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o640);
    assert_eq!(fs::read_to_string(&path).unwrap(), "replaced");
    // No temporary files left behind
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_audit_record_timestamp_format() {
    use chrono::{NaiveDate, Utc};

    let time = NaiveDate::from_ymd_opt(2024, 4, 7)
        .unwrap()
        .and_hms_opt(9, 5, 3)
        .unwrap()
        .and_utc();
    let record = AuditRecord::at(&time.with_timezone(&Utc));
    assert_eq!(record.key, ISOLATED_TIME_KEY);
    assert_eq!(record.timestamp, "2024-04-07T09:05:03");

    let now = AuditRecord::now();
    assert_eq!(now.timestamp.len(), "YYYY-MM-DDTHH:MM:SS".len());
}

use bon::bon;
use pf_isolate::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Initialize tracing for integration tests with maximum verbosity
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("pf_isolate=trace,isolation_tests=trace")
        .with_test_writer()
        .try_init();
}

/// Shell script standing in for pfctl.
///
/// It is run as `sh -c <script> pfctl <args>`. Every invocation is appended to
/// `argv.log`. Loaded rules replace `active.rules`, which `-s rules` prints
/// back. An invocation whose first argument equals `fail_flag` exits 1.
pub struct FakePfctl {
    dir: TempDir,
    script: String,
}

#[bon]
impl FakePfctl {
    #[builder]
    pub fn new(#[builder(into)] fail_flag: Option<String>) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let log = dir.path().join("argv.log");
        let active = dir.path().join("active.rules");
        let fail_flag = fail_flag.unwrap_or_else(|| "--never".to_string());

        let script = format!(
            r#"printf '%s\n' "$*" >> '{log}'
if [ "$1" = '{fail}' ]; then echo "pfctl: {fail} failed" >&2; exit 1; fi
case "$1" in
  -f) if [ "$2" = "-" ]; then cat > '{active}'; else cat "$2" > '{active}'; fi ;;
  -s) cat '{active}' 2>/dev/null ;;
esac
exit 0
"#,
            log = log.display(),
            active = active.display(),
            fail = fail_flag,
        );

        Self { dir, script }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn wrapper(&self) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), self.script.clone()]
    }

    /// Settings pointing the pipeline at `document` and this fake
    pub fn settings(&self, document: &Path) -> Settings {
        Settings::builder()
            .document_path(document)
            .pfctl("pfctl")
            .pfctl_wrapper(self.wrapper())
            .build()
    }

    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(self.dir().join("argv.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn active_rules(&self) -> String {
        fs::read_to_string(self.dir().join("active.rules")).unwrap_or_default()
    }
}

/// Write `contents` as `ossec.conf` in a fresh temp dir
pub fn write_document(contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("ossec.conf");
    fs::write(&path, contents).expect("write document");
    (dir, path)
}

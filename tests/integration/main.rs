//! Integration tests for Hearth

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn hearth() -> Command {
        cargo_bin_cmd!("hearth")
    }

    /// An application root plus an isolated config location
    struct App {
        dir: TempDir,
    }

    impl App {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn write(&self, name: &str, contents: &str) {
            let path = self.dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn cmd(&self) -> Command {
            let mut cmd = hearth();
            cmd.env("HEARTH_CONFIG", self.root().join("config").join("config.toml"))
                .env("HEARTH_ROOT", self.root());
            cmd
        }
    }

    #[test]
    fn help_displays() {
        hearth()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("dependency-invalidation"));
    }

    #[test]
    fn version_displays() {
        hearth()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("hearth"));
    }

    #[test]
    fn resolve_relative_identifier() {
        hearth()
            .args(["resolve", "./helper", "index"])
            .assert()
            .success()
            .stdout("helper\n");

        hearth()
            .args(["resolve", "helper2", "modules/helper"])
            .assert()
            .success()
            .stdout("modules/helper2\n");
    }

    #[test]
    fn resolve_outside_root_fails() {
        hearth()
            .args(["resolve", "../helper", "index"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("outside"));
    }

    #[test]
    fn resolve_empty_identifier_fails() {
        hearth()
            .args(["resolve", "", "index"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("non-empty"));
    }

    #[test]
    fn config_path() {
        hearth()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        hearth()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"));
    }

    #[test]
    fn config_init_then_refuse() {
        let app = App::new();

        app.cmd()
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(app.root().join("config").join("config.toml").exists());

        app.cmd()
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--force"));
    }

    #[test]
    fn invalid_config_reports_hint() {
        let app = App::new();
        app.write("config/config.toml", "[resources]\nmax_file_size_to_load = 0\n");

        app.cmd()
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("config init --force"));
    }

    #[test]
    fn load_static_json() {
        let app = App::new();
        app.write("public/hello.txt", "hello");

        app.cmd()
            .args(["load", "static", "hello.txt", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "/2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824/hello.txt",
            ))
            .stdout(predicate::str::contains("\"key\": \"static:public/hello.txt\""));
    }

    #[test]
    fn load_missing_resource_fails() {
        let app = App::new();

        app.cmd()
            .args(["load", "static", "missing.txt"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn load_stylesheet_records_dependency() {
        let app = App::new();
        app.write("public/img.png", "png");
        app.write("public/site.css", "body { background: url(img.png); }\n");

        app.cmd()
            .args(["load", "stylesheet", "site.css", "--format", "plain", "--inspect"])
            .assert()
            .success()
            .stdout(predicate::str::contains("/site.css"))
            .stdout(predicate::str::contains(
                "static:public/img.png -> stylesheet:public/site.css",
            ));
    }

    #[test]
    fn load_less_stylesheet_from_settings() {
        let app = App::new();
        app.write("app.toml", "less = [\"theme.css\"]\n");
        app.write("public/theme.less", "p { color: red; }\n");

        app.cmd()
            .args(["load", "stylesheet", "theme.css", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[less=true]"))
            .stdout(predicate::str::contains("theme.less"));
    }

    #[test]
    fn load_document_and_module() {
        let app = App::new();
        app.write("index.html", "<html></html>");
        app.write("index.server.js", "const helper = require('./helper');\n");
        app.write("helper.js", "module.exports = { ok: true };\n");

        app.cmd()
            .args(["load", "document", "index", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"./helper\""));

        app.cmd()
            .args(["load", "module", "./helper", "--from", "index", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("/helper"));
    }

    #[test]
    fn load_document_lists_shared_requires() {
        let app = App::new();
        app.write("index.html", "<html></html>");
        app.write("index.js", "console.log('client');\n");
        app.write("index.shared.js", "const format = require('./format');\n");

        app.cmd()
            .args(["load", "document", "index", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"./format\""))
            .stdout(predicate::str::contains("index.shared.js"));
    }

    #[test]
    fn load_module_requires_document() {
        let app = App::new();

        app.cmd()
            .args(["load", "module", "helper"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--from"));
    }

    #[test]
    fn unbalanced_script_is_not_viable() {
        let app = App::new();
        app.write("broken.js", "function f() {\n");

        app.cmd()
            .args(["load", "script", "broken.js"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not viable"));
    }
}

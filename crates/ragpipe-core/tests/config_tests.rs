use figment::Jail;
use std::path::{Path, PathBuf};

use ragpipe_core::config::{expand_path, resolve_with_base, Config};

#[test]
fn environment_file_and_variables_layer_over_base_file() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[chunking]\nchunk_size = 50\n[retrieval]\ntop_k = 5\n")?;
        jail.create_file("config.test.toml", "[chunking]\nchunk_size = 60\n")?;
        jail.set_env("RUST_ENV", "test");
        jail.set_env("APP_RETRIEVAL__EXIT_SENTINEL", "quit");

        let config = Config::load().map_err(|e| e.to_string())?;
        let settings = config.settings().map_err(|e| e.to_string())?;
        assert_eq!(config.env_name(), "test");
        assert_eq!(settings.chunking.chunk_size, 60);
        assert_eq!(settings.retrieval.top_k, 5);
        assert_eq!(settings.retrieval.exit_sentinel, "quit");
        assert_eq!(settings.models.max_len, 256);
        Ok(())
    });
}

#[test]
fn runs_without_any_config_file() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "prod");
        let settings = Config::load().map_err(|e| e.to_string())?.settings().map_err(|e| e.to_string())?;
        assert_eq!(settings.chunking.chunk_size, 100);
        assert_eq!(settings.data.chunks_file, "processed_documents.json");
        Ok(())
    });
}

#[test]
fn invalid_override_fails_at_load() {
    Jail::expect_with(|jail| {
        jail.set_env("APP_RETRIEVAL__TOP_K", 0);
        assert!(Config::load().is_err());
        Ok(())
    });
}

#[test]
fn paths_expand_variables_and_home() {
    Jail::expect_with(|jail| {
        jail.set_env("RAGPIPE_DATA_ROOT", "/srv/ragpipe");
        jail.set_env("HOME", "/home/tester");

        let base = Path::new("/work");
        assert_eq!(resolve_with_base(base, "${RAGPIPE_DATA_ROOT}/x"), PathBuf::from("/srv/ragpipe/x"));
        assert_eq!(resolve_with_base(base, "$RAGPIPE_DATA_ROOT/y"), PathBuf::from("/srv/ragpipe/y"));
        assert_eq!(expand_path("~/x"), PathBuf::from("/home/tester/x"));
        assert_eq!(resolve_with_base(base, "~/x"), PathBuf::from("/home/tester/x"));
        assert_eq!(resolve_with_base(base, "docs"), PathBuf::from("/work/docs"));
        Ok(())
    });
}

use std::env;
use std::path::PathBuf;

fn fallback_dotenv_paths(
    archive_home: Option<PathBuf>,
    config_dir: Option<PathBuf>,
) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(home) = archive_home {
        paths.push(home.join(".env"));
    }
    if let Some(config) = config_dir {
        paths.push(config.join("chat-archive/.env"));
    }
    paths
}

pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallbacks = fallback_dotenv_paths(
        env::var_os("CHAT_ARCHIVE_HOME").map(PathBuf::from),
        dirs::config_dir(),
    );
    if let Some(path) = fallbacks.into_iter().find(|path| path.is_file()) {
        let _ = dotenvy::from_path(&path);
    }
}

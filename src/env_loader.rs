use std::env;
use std::path::PathBuf;

fn fallback_dotenv_path(intel_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(intel_home) = intel_home.filter(|p| !p.as_os_str().is_empty()) {
        return Some(intel_home.join(".env"));
    }
    Some(home_dir?.join("goodwing/.env"))
}

pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("INTEL_REPORT_HOME").map(PathBuf::from),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}

use std::path::{Path, PathBuf};

pub fn resolve_assets_root(cli: Option<PathBuf>) -> PathBuf {
    // Precedence: CLI flag -> VOXMESH_ASSETS env -> search nearby dirs -> CWD
    if let Some(pb) = cli.filter(|p| p.exists()) {
        return pb;
    }
    if let Some(pb) = std::env::var_os("VOXMESH_ASSETS")
        .map(PathBuf::from)
        .filter(|p| p.exists())
    {
        return pb;
    }
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd);
    }
    if let Some(dir) = std::env::current_exe().ok().and_then(|e| e.parent().map(Path::to_path_buf)) {
        candidates.push(dir);
    }
    candidates.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")));

    for base in candidates {
        // climb up to 5 parents
        for dir in base.ancestors().take(5) {
            if blocks_path(dir).exists() {
                return dir.to_path_buf();
            }
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

pub fn blocks_path(root: &Path) -> PathBuf {
    root.join("assets/blocks.toml")
}

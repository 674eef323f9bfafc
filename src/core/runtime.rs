use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// 宿主入口程序的身份（解析后的可执行文件路径）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramIdentity {
    pub path: PathBuf,
}

impl ProgramIdentity {
    /// 当前进程的入口程序
    pub fn current() -> Option<Self> {
        let exe = std::env::current_exe().ok()?;
        Some(Self::from_path(exe))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self { path }
    }

    /// 不含扩展名的程序名
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "autoviz".to_string())
    }

    pub fn directory(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

static PROGRAM_IDENTITY: OnceLock<ProgramIdentity> = OnceLock::new();

/// 设置进程级入口程序身份，只有第一次调用生效
pub fn init_program_identity(identity: ProgramIdentity) {
    let _ = PROGRAM_IDENTITY.set(identity);
}

/// 进程级入口程序身份，未设置时取当前可执行文件
pub fn program_identity() -> Option<ProgramIdentity> {
    if let Some(identity) = PROGRAM_IDENTITY.get() {
        return Some(identity.clone());
    }
    ProgramIdentity::current()
}

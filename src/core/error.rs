use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("子系统初始化失败: {0}")]
    Initialization(String),

    #[error("无法打开文件 {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("无法读取流信息: {0}")]
    Probe(String),

    #[error("无法找到视频流: {0}")]
    StreamNotFound(String),

    #[error("不支持的编解码器: {0}")]
    UnsupportedCodec(String),

    #[error("解码上下文错误: {0}")]
    Context(String),

    #[error("内存分配失败: {0}")]
    Allocation(String),

    #[error("显示表面错误: {0}")]
    Surface(String),

    #[error("读取数据包失败: {0}")]
    Read(String),

    #[error("解码错误: {0}")]
    Decode(String),

    #[error("无法加载图片 {path}: {reason}")]
    Image { path: String, reason: String },
}

/// 错误类别（不携带上下文，便于调用方匹配）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Initialization,
    Open,
    Probe,
    StreamNotFound,
    UnsupportedCodec,
    Context,
    Allocation,
    Surface,
    Read,
    Decode,
    Image,
}

impl PlayerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlayerError::Initialization(_) => ErrorKind::Initialization,
            PlayerError::Open { .. } => ErrorKind::Open,
            PlayerError::Probe(_) => ErrorKind::Probe,
            PlayerError::StreamNotFound(_) => ErrorKind::StreamNotFound,
            PlayerError::UnsupportedCodec(_) => ErrorKind::UnsupportedCodec,
            PlayerError::Context(_) => ErrorKind::Context,
            PlayerError::Allocation(_) => ErrorKind::Allocation,
            PlayerError::Surface(_) => ErrorKind::Surface,
            PlayerError::Read(_) => ErrorKind::Read,
            PlayerError::Decode(_) => ErrorKind::Decode,
            PlayerError::Image { .. } => ErrorKind::Image,
        }
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let err = PlayerError::Open {
            path: "a.mp4".into(),
            reason: "No such file or directory".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Open);
        assert_eq!(
            PlayerError::Decode("bad packet".into()).kind(),
            ErrorKind::Decode
        );
        assert_eq!(
            PlayerError::StreamNotFound("a.mp3".into()).kind(),
            ErrorKind::StreamNotFound
        );
    }

    #[test]
    fn message_includes_path() {
        let err = PlayerError::Open {
            path: "/tmp/missing.mkv".into(),
            reason: "No such file or directory".into(),
        };
        assert!(err.to_string().contains("/tmp/missing.mkv"));
    }
}

use std::path::{Path, PathBuf};

use actix_multipart::form::tempfile::TempFile;
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};

use crate::model::global_error::{AppError, ErrorCode};

pub const ALLOWED_EXTENSIONS: [&str; 7] = ["pdf", "doc", "docx", "txt", "png", "jpg", "jpeg"];
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

const UPLOAD_DIR: &str = "ticket_uploads";

/// 검증을 통과한 첨부 파일 (아직 저장되지 않음)
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// 저장된 첨부 파일. `path` 는 미디어 루트 기준 상대 경로.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: String,
    pub checksum: String,
}

impl Attachment {
    pub fn new(file_name: &str, bytes: Vec<u8>) -> Result<Self, AppError> {
        validate(file_name, bytes.len())?;
        Ok(Self {
            file_name: sanitize_file_name(file_name),
            bytes,
        })
    }

    /// multipart 업로드를 첨부 파일로 변환한다. 파일을 고르지 않은 빈 파트는 None.
    pub async fn from_temp_file(upload: TempFile) -> Result<Option<Self>, AppError> {
        let file_name = upload.file_name.as_deref().map(str::trim).unwrap_or_default();
        if file_name.is_empty() && upload.size == 0 {
            return Ok(None);
        }

        validate(file_name, upload.size)?;

        let bytes = tokio::fs::read(upload.file.path()).await.map_err(|err| {
            error!(error = %err, "업로드 임시 파일 읽기 실패");
            AppError::new(ErrorCode::FileStorageError)
        })?;

        Ok(Some(Self {
            file_name: sanitize_file_name(file_name),
            bytes,
        }))
    }
}

pub fn validate(file_name: &str, size: usize) -> Result<(), AppError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => {
            return Err(AppError::field(
                "upload",
                format!(
                    "File type not supported. Allowed types: {}",
                    ALLOWED_EXTENSIONS.join(", ")
                ),
            ));
        }
    }

    if size > MAX_UPLOAD_BYTES {
        return Err(AppError::field(
            "upload",
            "File size too large. Maximum size is 5MB.",
        ));
    }

    Ok(())
}

/// 경로 구분자를 제거하고 안전한 문자만 남긴다.
fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);

    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// 로컬 디스크 첨부 파일 저장소
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    url_prefix: String,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn save(&self, attachment: &Attachment) -> Result<StoredFile, AppError> {
        let relative = format!(
            "{}/{}_{}",
            UPLOAD_DIR,
            uuid::Uuid::new_v4().simple(),
            attachment.file_name
        );
        let target = self.root.join(&relative);

        let write = async {
            tokio::fs::create_dir_all(self.root.join(UPLOAD_DIR)).await?;
            tokio::fs::write(&target, &attachment.bytes).await
        };
        write.await.map_err(|err| {
            error!(error = %err, path = %target.display(), "첨부 파일 저장 실패");
            AppError::new(ErrorCode::FileStorageError)
        })?;

        let checksum = hex::encode(Sha256::digest(&attachment.bytes));
        info!(path = %relative, size = attachment.bytes.len(), "첨부 파일 저장 완료");

        Ok(StoredFile {
            path: relative,
            checksum,
        })
    }

    /// 파일 삭제 실패는 기록만 한다.
    pub async fn remove(&self, relative: &str) {
        if let Err(err) = tokio::fs::remove_file(self.root.join(relative)).await {
            warn!(error = %err, path = relative, "첨부 파일 삭제 실패");
        }
    }

    pub fn url(&self, relative: &str) -> String {
        format!("{}/{}", self.url_prefix.trim_end_matches('/'), relative)
    }
}

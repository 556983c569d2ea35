use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::board::{self, Post};
use crate::csv;
use crate::sheet;

/// Source of the post collection. Each call is a full reload.
pub trait BoardService: Send + Sync {
    fn load_posts(&self) -> Result<Vec<Post>>;
    fn describe(&self) -> String;
}

fn posts_from_text(text: &str) -> Vec<Post> {
    board::materialize(&csv::decode(text))
}

pub struct SheetBoardService {
    client: Arc<sheet::Client>,
}

impl SheetBoardService {
    pub fn new(client: Arc<sheet::Client>) -> Self {
        Self { client }
    }
}

impl BoardService for SheetBoardService {
    fn load_posts(&self) -> Result<Vec<Post>> {
        let text = self.client.fetch_csv().context("fetch sheet export")?;
        Ok(posts_from_text(&text))
    }

    fn describe(&self) -> String {
        self.client.url().host_str().unwrap_or("sheet").to_string()
    }
}

/// Reads the export from a local file, for offline use and `--file`.
pub struct FileBoardService {
    path: PathBuf,
}

impl FileBoardService {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl BoardService for FileBoardService {
    fn load_posts(&self) -> Result<Vec<Post>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("read CSV file at {}", self.path.display()))?;
        Ok(posts_from_text(&text))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Default)]
pub struct MockBoardService;

impl BoardService for MockBoardService {
    fn load_posts(&self) -> Result<Vec<Post>> {
        Ok(posts_from_text(MOCK_SHEET))
    }

    fn describe(&self) -> String {
        "sample data".to_string()
    }
}

const MOCK_SHEET: &str = "タイムスタンプ,研究名,詳細
2024/04/01 10:00:00,視線計測実験への参加者募集,\"所要時間: 約60分
謝礼: 1,500円\"
2024/04/03 09:30:00,オンライン質問紙調査,\"所要時間: 約15分
謝礼: なし\"
";

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn mock_service_yields_sample_posts() {
        let posts = MockBoardService.load_posts().unwrap();
        assert_eq!(posts.len(), 2);
        assert!(posts[0].details.contains("1,500円"));
        assert_eq!(posts[1].origin_index, 1);
    }

    #[test]
    fn file_service_reads_local_export() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "ts,title,details\r\n2024-01-01,Study A,Paid\r\n").unwrap();
        let service = FileBoardService::new(file.path().to_path_buf());
        let posts = service.load_posts().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Study A");
    }

    #[test]
    fn file_service_reports_missing_file() {
        let service = FileBoardService::new(PathBuf::from("/nonexistent/board.csv"));
        let err = service.load_posts().unwrap_err();
        assert!(format!("{err:#}").contains("read CSV file"));
    }
}

//! 定跡
//!
//! テキスト形式。`sfen` で始まる行で局面を指定し、続く行に
//! `<指し手> <出現回数>` を並べる。`#` で始まる行と空行は読み飛ばす。
//!
//! ```text
//! sfen lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1
//! 7g7f 120
//! 2g2f 95
//! ```
//!
//! 局面は Zobrist キーで引くので、手数が違っても同じ局面なら同じ項目になる。

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::position::{Position, SfenError};
use crate::types::Move;

/// 定跡ファイルのエラー
#[derive(thiserror::Error, Debug)]
pub enum BookError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: {source}")]
    Sfen {
        line: usize,
        #[source]
        source: SfenError,
    },

    #[error("line {line}: expected `<move> <count>`, got {text:?}")]
    Syntax { line: usize, text: String },

    #[error("line {line}: move listed before any sfen line")]
    NoPosition { line: usize },
}

/// 定跡の1手
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMove {
    /// USI 形式の指し手（引くときに局面で解釈する）
    pub usi: String,
    pub count: u32,
}

/// 定跡
#[derive(Debug, Default)]
pub struct Book {
    entries: HashMap<u64, Vec<BookMove>>,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    /// ファイルから読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BookError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| BookError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let book = Self::parse(&text)?;
        log::info!("loaded book from {} ({} positions)", path.display(), book.len());
        Ok(book)
    }

    /// テキストから読み込む
    pub fn parse(text: &str) -> Result<Self, BookError> {
        let mut book = Book::new();
        let mut current: Option<u64> = None;
        let mut pos = Position::new();

        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let s = raw.trim();
            if s.is_empty() || s.starts_with('#') {
                continue;
            }

            if let Some(sfen) = s.strip_prefix("sfen ") {
                pos.set_sfen(sfen.trim())
                    .map_err(|source| BookError::Sfen { line, source })?;
                current = Some(pos.key());
                continue;
            }

            let key = current.ok_or(BookError::NoPosition { line })?;
            let mut fields = s.split_whitespace();
            let (Some(usi), Some(count), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(BookError::Syntax {
                    line,
                    text: s.to_string(),
                });
            };
            let count = count.parse::<u32>().map_err(|_| BookError::Syntax {
                line,
                text: s.to_string(),
            })?;
            book.insert(key, usi, count);
        }
        Ok(book)
    }

    /// 手を追加する（同じ手がすでにあれば回数を足す）
    pub fn insert(&mut self, key: u64, usi: &str, count: u32) {
        let moves = self.entries.entry(key).or_default();
        match moves.iter_mut().find(|m| m.usi == usi) {
            Some(m) => m.count = m.count.saturating_add(count),
            None => moves.push(BookMove {
                usi: usi.to_string(),
                count,
            }),
        }
    }

    /// 登録されている局面の数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 局面に登録された手（ファイルに書かれた順）
    pub fn moves(&self, pos: &Position) -> &[BookMove] {
        self.entries.get(&pos.key()).map_or(&[], Vec::as_slice)
    }

    /// 出現回数が最も多い合法手を返す
    ///
    /// 同じ回数なら先に書かれた手を選ぶ。非合法な手は飛ばす。
    pub fn probe(&self, pos: &Position) -> Option<Move> {
        let mut best: Option<(Move, u32)> = None;
        for entry in self.moves(pos) {
            let Some(m) = pos.move_from_usi(&entry.usi) else {
                continue;
            };
            if !(pos.pseudo_legal(m) && pos.is_legal(m)) {
                continue;
            }
            if best.is_none_or(|(_, count)| entry.count > count) {
                best = Some((m, entry.count));
            }
        }
        best.map(|(m, _)| m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::SFEN_HIRATE;

    const BOOK: &str = "\
# test book
sfen lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1
2g2f 30
7g7f 50
5a5b 99
3c3d 999

sfen lnsgkgsnl/1r5b1/ppppppppp/9/9/2P6/PP1PPPPPP/1B5R1/LNSGKGSNL w - 2
3c3d 10
";

    fn position(sfen: &str) -> Position {
        let mut pos = Position::new();
        pos.set_sfen(sfen).unwrap();
        pos
    }

    #[test]
    fn test_probe_picks_highest_count_legal_move() {
        let book = Book::parse(BOOK).unwrap();
        assert_eq!(book.len(), 2);

        let pos = position(SFEN_HIRATE);
        // 5a5b と 3c3d は先手番では指せないので選ばれない
        assert_eq!(book.probe(&pos).map(|m| m.to_usi()), Some("7g7f".to_string()));
    }

    #[test]
    fn test_probe_ignores_ply_number() {
        let book = Book::parse(BOOK).unwrap();
        let pos = position("lnsgkgsnl/1r5b1/ppppppppp/9/9/2P6/PP1PPPPPP/1B5R1/LNSGKGSNL w - 40");
        assert_eq!(book.probe(&pos).map(|m| m.to_usi()), Some("3c3d".to_string()));
    }

    #[test]
    fn test_probe_unknown_position() {
        let book = Book::parse(BOOK).unwrap();
        let pos = position("4k4/9/9/9/9/9/9/9/4K4 b G 1");
        assert!(book.probe(&pos).is_none());
        assert!(book.moves(&pos).is_empty());
    }

    #[test]
    fn test_tie_keeps_file_order() {
        let text = format!("sfen {SFEN_HIRATE}\n2g2f 10\n7g7f 10\n");
        let book = Book::parse(&text).unwrap();
        let pos = position(SFEN_HIRATE);
        assert_eq!(book.probe(&pos).map(|m| m.to_usi()), Some("2g2f".to_string()));
    }

    #[test]
    fn test_duplicate_moves_are_merged() {
        let text = format!("sfen {SFEN_HIRATE}\n2g2f 10\n7g7f 15\n2g2f 10\n");
        let book = Book::parse(&text).unwrap();
        let pos = position(SFEN_HIRATE);
        assert_eq!(book.moves(&pos).len(), 2);
        assert_eq!(book.probe(&pos).map(|m| m.to_usi()), Some("2g2f".to_string()));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Book::parse("7g7f 1"), Err(BookError::NoPosition { line: 1 })));
        assert!(matches!(
            Book::parse(&format!("sfen {SFEN_HIRATE}\n7g7f\n")),
            Err(BookError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            Book::parse(&format!("sfen {SFEN_HIRATE}\n7g7f many\n")),
            Err(BookError::Syntax { line: 2, .. })
        ));
        assert!(matches!(Book::parse("sfen xyz"), Err(BookError::Sfen { line: 1, .. })));
    }
}

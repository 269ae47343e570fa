//! SFEN形式の解析・出力

use thiserror::Error;

use crate::types::{Color, File, Hand, Piece, PieceType, Rank, Square};

use super::Position;

/// 平手初期局面
pub const SFEN_HIRATE: &str = "lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1";

/// SFEN解析エラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SfenError {
    #[error("sfen has too few fields: {0:?}")]
    MissingField(String),
    #[error("invalid board in sfen: {0}")]
    InvalidBoard(String),
    #[error("invalid side to move: {0:?}")]
    InvalidSideToMove(String),
    #[error("invalid hand: {0:?}")]
    InvalidHand(String),
    #[error("invalid ply: {0:?}")]
    InvalidPly(String),
}

impl Position {
    /// SFEN文字列から局面を設定する
    ///
    /// 手数フィールドは省略可能（省略時は1）。
    pub fn set_sfen(&mut self, sfen: &str) -> Result<(), SfenError> {
        let mut fields = sfen.split_whitespace();
        let board = fields
            .next()
            .ok_or_else(|| SfenError::MissingField(sfen.to_string()))?;
        let stm = fields
            .next()
            .ok_or_else(|| SfenError::MissingField(sfen.to_string()))?;
        let hand = fields
            .next()
            .ok_or_else(|| SfenError::MissingField(sfen.to_string()))?;
        let ply = fields.next();

        self.clear();
        self.parse_board(board)?;

        self.side_to_move = match stm {
            "b" => Color::Black,
            "w" => Color::White,
            _ => return Err(SfenError::InvalidSideToMove(stm.to_string())),
        };

        self.parse_hand(hand)?;

        self.game_ply = match ply {
            Some(p) => p.parse::<i32>().map_err(|_| SfenError::InvalidPly(p.to_string()))?,
            None => 1,
        };

        self.reset_state();
        Ok(())
    }

    fn parse_board(&mut self, board: &str) -> Result<(), SfenError> {
        let ranks: Vec<&str> = board.split('/').collect();
        if ranks.len() != Rank::NUM {
            return Err(SfenError::InvalidBoard(format!("expected 9 ranks, got {}", ranks.len())));
        }
        for (r, line) in ranks.iter().enumerate() {
            let rank = Rank::ALL[r];
            // 左端が9筋
            let mut file_pos: i32 = 8;
            let mut promoted = false;
            for ch in line.chars() {
                if ch == '+' {
                    promoted = true;
                    continue;
                }
                if let Some(d) = ch.to_digit(10) {
                    if promoted {
                        return Err(SfenError::InvalidBoard(format!("'+' before digit in {line}")));
                    }
                    file_pos -= d as i32;
                    continue;
                }
                let base = PieceType::from_sfen_char(ch)
                    .ok_or_else(|| SfenError::InvalidBoard(format!("unknown piece '{ch}'")))?;
                let pt = if promoted {
                    base.promote()
                        .ok_or_else(|| SfenError::InvalidBoard(format!("cannot promote '{ch}'")))?
                } else {
                    base
                };
                promoted = false;
                if file_pos < 0 {
                    return Err(SfenError::InvalidBoard(format!("rank too long: {line}")));
                }
                let color = if ch.is_ascii_uppercase() { Color::Black } else { Color::White };
                let file = File::ALL[file_pos as usize];
                let sq = Square::new(file, rank);
                if pt == PieceType::King && self.king_square(color).is_some() {
                    return Err(SfenError::InvalidBoard("duplicate king".to_string()));
                }
                self.put_piece(Piece::new(color, pt), sq);
                file_pos -= 1;
            }
            if file_pos != -1 {
                return Err(SfenError::InvalidBoard(format!("rank has wrong width: {line}")));
            }
        }
        Ok(())
    }

    fn parse_hand(&mut self, hand: &str) -> Result<(), SfenError> {
        if hand == "-" {
            return Ok(());
        }
        let mut count: u32 = 0;
        for ch in hand.chars() {
            if let Some(d) = ch.to_digit(10) {
                count = count * 10 + d;
                continue;
            }
            let pt = PieceType::from_sfen_char(ch)
                .filter(|pt| pt.hand_index() < PieceType::HAND_NUM)
                .ok_or_else(|| SfenError::InvalidHand(hand.to_string()))?;
            let color = if ch.is_ascii_uppercase() { Color::Black } else { Color::White };
            let n = if count == 0 { 1 } else { count };
            if n > pt.max_hand_count() {
                return Err(SfenError::InvalidHand(hand.to_string()));
            }
            let h: Hand = self.hands[color.index()];
            self.hands[color.index()] = h.set(pt, h.count(pt) + n);
            count = 0;
        }
        Ok(())
    }

    /// SFEN文字列を出力する
    pub fn to_sfen(&self) -> String {
        let mut s = String::new();
        for (r, rank) in Rank::ALL.into_iter().enumerate() {
            if r > 0 {
                s.push('/');
            }
            let mut empty = 0;
            for file in File::ALL.into_iter().rev() {
                let pc = self.piece_on(Square::new(file, rank));
                if pc.is_none() {
                    empty += 1;
                    continue;
                }
                if empty > 0 {
                    s.push_str(&empty.to_string());
                    empty = 0;
                }
                s.push_str(&pc.to_sfen());
            }
            if empty > 0 {
                s.push_str(&empty.to_string());
            }
        }

        s.push(' ');
        s.push(self.side_to_move.to_sfen_char());
        s.push(' ');

        // 手駒は飛角金銀桂香歩の順
        const ORDER: [PieceType; 7] = [
            PieceType::Rook,
            PieceType::Bishop,
            PieceType::Gold,
            PieceType::Silver,
            PieceType::Knight,
            PieceType::Lance,
            PieceType::Pawn,
        ];
        let mut hand_str = String::new();
        for c in Color::ALL {
            for pt in ORDER {
                let n = self.hand(c).count(pt);
                if n == 0 {
                    continue;
                }
                if n > 1 {
                    hand_str.push_str(&n.to_string());
                }
                let ch = pt.sfen_char();
                hand_str.push(if c == Color::Black { ch } else { ch.to_ascii_lowercase() });
            }
        }
        if hand_str.is_empty() {
            hand_str.push('-');
        }
        s.push_str(&hand_str);
        s.push(' ');
        s.push_str(&self.game_ply.to_string());
        s
    }
}

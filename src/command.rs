// =============================================================================
// Text commands
//
// A command names a piece and where it goes: "<SIDE><TYPE>[ID] <DEST>", e.g.
// "WP5 E4" or "BN1 C6". SIDE is W or B. TYPE is P, R, B, Q, N or K. A
// three-character K token ("WK1") is a knight; the two-character "WK" is the
// king. DEST is either a square or another piece token, which means "capture
// that piece wherever it stands". Anything malformed parses to `None`.
// =============================================================================

use crate::board::Board;
use crate::piece::{Color, Piece, PieceType};
use crate::position::Position;

/// A piece named by side, type and instance id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PieceRef {
    pub color: Color,
    pub piece_type: PieceType,
    pub id: u8,
}

impl PieceRef {
    pub fn resolve<'b>(&self, board: &'b Board) -> Option<&'b Piece> {
        board.find_piece(self.color, self.piece_type, self.id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Square(Position),
    Piece(PieceRef),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command {
    pub piece: PieceRef,
    pub target: Target,
}

impl Command {
    /// The named piece and its destination square on `board`, or `None` when
    /// either piece is not on the board.
    pub fn resolve(&self, board: &Board) -> Option<(Piece, Position)> {
        let piece = *self.piece.resolve(board)?;
        let to = match self.target {
            Target::Square(position) => position,
            Target::Piece(target) => target.resolve(board)?.position,
        };
        Some((piece, to))
    }
}

pub fn parse(text: &str) -> Option<Command> {
    let mut tokens = text.split_whitespace();
    let (Some(piece), Some(dest), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return None;
    };
    let piece = parse_piece(piece)?;
    let dest = dest.to_ascii_uppercase();
    let target = match Position::from_notation(&dest) {
        Ok(position) => Target::Square(position),
        Err(_) => Target::Piece(parse_piece(&dest)?),
    };
    Some(Command { piece, target })
}

pub fn parse_piece(token: &str) -> Option<PieceRef> {
    let token = token.to_ascii_uppercase();
    let mut chars = token.chars();
    let color = Color::from_letter(chars.next()?)?;
    let letter = chars.next()?;
    let id: String = chars.collect();

    let piece_type = match (letter, id.len()) {
        ('K', 0) => return Some(PieceRef { color, piece_type: PieceType::King, id: 1 }),
        ('K' | 'N', 1) => PieceType::Knight,
        ('P', 1) => PieceType::Pawn,
        ('R', 1) => PieceType::Rook,
        ('B', 1) => PieceType::Bishop,
        ('Q', 1) => PieceType::Queen,
        _ => return None,
    };
    let id = id.parse::<u8>().ok().filter(|&id| id > 0)?;
    Some(PieceRef { color, piece_type, id })
}

/// Command text that moves `piece` to `to`. Knights are written with N.
pub fn format_command(piece: &Piece, to: Position) -> String {
    format!("{} {}", piece_token(piece), to)
}

pub fn piece_token(piece: &Piece) -> String {
    match piece.piece_type() {
        PieceType::King => format!("{}K", piece.color.letter()),
        pt => format!("{}{}{}", piece.color.letter(), pt.letter(), piece.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(s: &str) -> Position {
        s.parse().unwrap()
    }

    #[test]
    fn parses_piece_and_square() {
        let cmd = parse("WP5 E4").unwrap();
        assert_eq!(cmd.piece, PieceRef { color: Color::White, piece_type: PieceType::Pawn, id: 5 });
        assert_eq!(cmd.target, Target::Square(pos("E4")));
        assert_eq!(parse("bn1 c6").map(|c| c.target), Some(Target::Square(pos("C6"))));
    }

    #[test]
    fn k_token_length_picks_king_or_knight() {
        assert_eq!(parse_piece("WK").map(|p| p.piece_type), Some(PieceType::King));
        assert_eq!(parse_piece("WK2").map(|p| (p.piece_type, p.id)), Some((PieceType::Knight, 2)));
        assert_eq!(parse_piece("BN1").map(|p| p.piece_type), Some(PieceType::Knight));
    }

    #[test]
    fn destination_may_name_a_piece() {
        let mut board = Board::standard();
        board.relocate(pos("D7"), pos("D3"));
        let cmd = parse("WP5 BP4").unwrap();
        assert_eq!(
            cmd.target,
            Target::Piece(PieceRef { color: Color::Black, piece_type: PieceType::Pawn, id: 4 })
        );
        let (piece, to) = cmd.resolve(&board).unwrap();
        assert_eq!(piece.position, pos("E2"));
        assert_eq!(to, pos("D3"));
    }

    #[test]
    fn malformed_commands_are_rejected() {
        for bad in ["", "WP5", "WP5 E4 E5", "XP5 E4", "WZ1 E4", "WP E4", "WQ E4", "WP0 E4", "WP5 Z9", "WP12 E4"] {
            assert!(parse(bad).is_none(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn missing_pieces_do_not_resolve() {
        let board = Board::standard();
        assert!(parse("WP9 E4").unwrap().resolve(&board).is_none());
        assert!(parse("WQ2 D4").unwrap().resolve(&board).is_none());
        assert!(parse("WP5 BQ2").unwrap().resolve(&board).is_none());
    }

    #[test]
    fn formatted_commands_parse_back() {
        let board = Board::standard();
        for piece in board.active_pieces() {
            let text = format_command(piece, pos("D4"));
            let cmd = parse(&text).unwrap();
            assert_eq!(cmd.resolve(&board).map(|(p, _)| p), Some(*piece), "{text}");
        }
    }
}

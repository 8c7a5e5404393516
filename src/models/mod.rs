pub mod game;

pub use game::{ApiResponse, MatchView, MoveView};

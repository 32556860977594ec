mod contribution;
mod leaderboard;
mod score;
mod streak;
mod timeperiod;

pub use contribution::*;
pub use leaderboard::*;
pub use score::*;
pub use streak::*;
pub use timeperiod::*;

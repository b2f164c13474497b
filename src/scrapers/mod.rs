pub mod sportsbet;

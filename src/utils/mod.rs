pub mod best_price;
pub mod data;
pub mod matching;
pub mod merge;
pub mod odds;

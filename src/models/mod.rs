pub mod audit;
pub mod step;
pub mod user;
pub mod work_item;

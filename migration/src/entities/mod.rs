pub mod link_daily_stat;
pub mod short_link;

pub use link_daily_stat::Entity as LinkDailyStatEntity;
pub use short_link::Entity as ShortLinkEntity;

use crate::storage::ShortLink;
use migration::entities::short_link;

pub fn model_to_shortlink(model: short_link::Model) -> ShortLink {
    ShortLink {
        code: model.short_code,
        target: model.target_url,
        created_at: model.created_at,
        expires_at: model.expires_at,
        access_count: model.access_count.max(0) as u64,
        last_access_at: model.last_access_at,
    }
}

/// Insert model; counters always start from the link's own values.
pub fn shortlink_to_active_model(link: &ShortLink) -> short_link::ActiveModel {
    use sea_orm::ActiveValue::Set;

    short_link::ActiveModel {
        short_code: Set(link.code.clone()),
        target_url: Set(link.target.clone()),
        created_at: Set(link.created_at),
        expires_at: Set(link.expires_at),
        access_count: Set(i64::try_from(link.access_count).unwrap_or(i64::MAX)),
        last_access_at: Set(link.last_access_at),
    }
}

//! 每日访问计数表
//!
//! 统计接口返回最近 30 天的分布，按 (short_code, day) 唯一聚合。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LinkDailyStat::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LinkDailyStat::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LinkDailyStat::ShortCode)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(LinkDailyStat::Day).date().not_null())
                    .col(
                        ColumnDef::new(LinkDailyStat::Count)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // upsert 依赖这个唯一索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_link_daily_stats_code_day")
                    .table(LinkDailyStat::Table)
                    .col(LinkDailyStat::ShortCode)
                    .col(LinkDailyStat::Day)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LinkDailyStat::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum LinkDailyStat {
    #[sea_orm(iden = "link_daily_stats")]
    Table,
    Id,
    ShortCode,
    Day,
    Count,
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ==================== 讨论主题表 ====================
        manager
            .create_table(
                Table::create()
                    .table(Discussions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Discussions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Discussions::StudentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Discussions::CloneId).big_integer().null())
                    .col(
                        ColumnDef::new(Discussions::LastSeq)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Discussions::MessageCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Discussions::LastActivityAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Discussions::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Discussions::Table, Discussions::StudentId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Discussions::Table, Discussions::CloneId)
                            .to(Clones::Table, Clones::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ==================== 讨论消息表 ====================
        manager
            .create_table(
                Table::create()
                    .table(DiscussionMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DiscussionMessages::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DiscussionMessages::DiscussionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiscussionMessages::Seq)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiscussionMessages::SenderId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DiscussionMessages::Content).text().not_null())
                    .col(
                        ColumnDef::new(DiscussionMessages::MessageType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiscussionMessages::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(DiscussionMessages::Table, DiscussionMessages::DiscussionId)
                            .to(Discussions::Table, Discussions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ==================== 未读计数表 ====================
        // 每个讨论固定两行：student 侧与 staff 侧
        manager
            .create_table(
                Table::create()
                    .table(DiscussionReads::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DiscussionReads::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DiscussionReads::DiscussionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DiscussionReads::Side).string().not_null())
                    .col(
                        ColumnDef::new(DiscussionReads::UnreadCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DiscussionReads::LastReadSeq)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DiscussionReads::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(DiscussionReads::Table, DiscussionReads::DiscussionId)
                            .to(Discussions::Table, Discussions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_discussions_student_id")
                    .table(Discussions::Table)
                    .col(Discussions::StudentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_discussions_clone_id")
                    .table(Discussions::Table)
                    .col(Discussions::CloneId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("idx_discussion_messages_seq")
                    .table(DiscussionMessages::Table)
                    .col(DiscussionMessages::DiscussionId)
                    .col(DiscussionMessages::Seq)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("idx_discussion_reads_side")
                    .table(DiscussionReads::Table)
                    .col(DiscussionReads::DiscussionId)
                    .col(DiscussionReads::Side)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DiscussionReads::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DiscussionMessages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Discussions::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    #[sea_orm(iden = "users")]
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Clones {
    #[sea_orm(iden = "clones")]
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Discussions {
    #[sea_orm(iden = "discussions")]
    Table,
    Id,
    StudentId,
    CloneId,
    LastSeq,
    MessageCount,
    LastActivityAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum DiscussionMessages {
    #[sea_orm(iden = "discussion_messages")]
    Table,
    Id,
    DiscussionId,
    Seq,
    SenderId,
    Content,
    MessageType,
    CreatedAt,
}

#[derive(DeriveIden)]
enum DiscussionReads {
    #[sea_orm(iden = "discussion_reads")]
    Table,
    Id,
    DiscussionId,
    Side,
    UnreadCount,
    LastReadSeq,
    UpdatedAt,
}

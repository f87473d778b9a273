use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_review_movie_id")
                    .table(Review::Table)
                    .col(Review::MovieId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_actor_actor_id")
                    .table(MovieActor::Table)
                    .col(MovieActor::ActorId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_movie_actor_actor_id").table(MovieActor::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_review_movie_id").table(Review::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Review {
    Table,
    MovieId,
}

#[derive(DeriveIden)]
enum MovieActor {
    Table,
    ActorId,
}

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Genre::Table)
                    .if_not_exists()
                    .col(pk_auto(Genre::Id))
                    .col(string_len(Genre::Name, 200))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Actor::Table)
                    .if_not_exists()
                    .col(pk_auto(Actor::Id))
                    .col(string_len(Actor::Name, 200))
                    .col(string_len_null(Actor::Birthday, 10))
                    .col(string_len_null(Actor::Nationality, 100).default("BR"))
                    .col(text_null(Actor::Bio))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Movie::Table)
                    .if_not_exists()
                    .col(pk_auto(Movie::Id))
                    .col(string_len(Movie::Title, 500))
                    .col(integer(Movie::GenreId))
                    .col(string_len_null(Movie::ReleaseDate, 10))
                    .col(text_null(Movie::Resume))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_genre")
                            .from(Movie::Table, Movie::GenreId)
                            .to(Genre::Table, Genre::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieActor::Table)
                    .if_not_exists()
                    .col(integer(MovieActor::MovieId))
                    .col(integer(MovieActor::ActorId))
                    .primary_key(Index::create().col(MovieActor::MovieId).col(MovieActor::ActorId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_actor_movie")
                            .from(MovieActor::Table, MovieActor::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_actor_actor")
                            .from(MovieActor::Table, MovieActor::ActorId)
                            .to(Actor::Table, Actor::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Review::Table)
                    .if_not_exists()
                    .col(pk_auto(Review::Id))
                    .col(integer(Review::MovieId))
                    .col(integer(Review::Stars))
                    .col(text_null(Review::Comment))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_movie")
                            .from(Review::Table, Review::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Review::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MovieActor::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movie::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Actor::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Genre::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Genre {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Actor {
    Table,
    Id,
    Name,
    Birthday,
    Nationality,
    Bio,
}

#[derive(DeriveIden)]
enum Movie {
    Table,
    Id,
    Title,
    GenreId,
    ReleaseDate,
    Resume,
}

#[derive(DeriveIden)]
enum MovieActor {
    Table,
    MovieId,
    ActorId,
}

#[derive(DeriveIden)]
enum Review {
    Table,
    Id,
    MovieId,
    Stars,
    Comment,
}

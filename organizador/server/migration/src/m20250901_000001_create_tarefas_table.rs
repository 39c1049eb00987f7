use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Tarefas {
    Table,
    Id,
    Titulo,
    Descricao,
    Data,
    Status,
}

const IDX_TAREFAS_DATA: &str = "idx-tarefas-data";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tarefas::Table)
                    .if_not_exists()
                    .col(pk_auto(Tarefas::Id))
                    .col(string(Tarefas::Titulo))
                    .col(string_null(Tarefas::Descricao))
                    .col(date_time(Tarefas::Data))
                    // Stores the status ordinal (0 = Pendente, 1 = Finalizado).
                    .col(integer(Tarefas::Status).default(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_TAREFAS_DATA)
                    .table(Tarefas::Table)
                    .col(Tarefas::Data)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(IDX_TAREFAS_DATA)
                    .table(Tarefas::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Tarefas::Table).to_owned())
            .await
    }
}

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_orders_table::Migration),
            Box::new(m20250101_000002_create_admins_table::Migration),
        ]
    }
}

mod m20250101_000001_create_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Orders::TrackingCode)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::StudentName).string().not_null())
                        .col(ColumnDef::new(Orders::RollNumber).string().not_null())
                        .col(ColumnDef::new(Orders::CollegeName).string().not_null())
                        .col(ColumnDef::new(Orders::Subject).string().not_null())
                        .col(ColumnDef::new(Orders::PracticalNumber).string().not_null())
                        .col(ColumnDef::new(Orders::TeacherName).string().not_null())
                        .col(
                            ColumnDef::new(Orders::MobileNumber)
                                .string_len(10)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::FileName).string().null())
                        .col(ColumnDef::new(Orders::FilePath).string().null())
                        .col(
                            ColumnDef::new(Orders::Pages)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::PrintType).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Orders::Binding)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Orders::Urgent)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Orders::Notes)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Orders::Amount)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::Status).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Orders::PaymentStatus)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::PaymentMethod)
                                .string_len(24)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::PaymentReference).string().null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Store-level uniqueness backs the collision-retry loop in the
            // order workflow.
            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_tracking_code")
                        .table(Orders::Table)
                        .col(Orders::TrackingCode)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_status_created_at")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .col(Orders::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Orders {
        Table,
        Id,
        TrackingCode,
        StudentName,
        RollNumber,
        CollegeName,
        Subject,
        PracticalNumber,
        TeacherName,
        MobileNumber,
        FileName,
        FilePath,
        Pages,
        PrintType,
        Binding,
        Urgent,
        Notes,
        Amount,
        Status,
        PaymentStatus,
        PaymentMethod,
        PaymentReference,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000002_create_admins_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_admins_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Admins::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Admins::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Admins::Username).string().not_null())
                        .col(ColumnDef::new(Admins::PasswordHash).string().not_null())
                        .col(
                            ColumnDef::new(Admins::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_admins_username")
                        .table(Admins::Table)
                        .col(Admins::Username)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Admins::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Admins {
        Table,
        Id,
        Username,
        PasswordHash,
        CreatedAt,
    }
}

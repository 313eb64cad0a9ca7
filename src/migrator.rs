use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_users_table::Migration),
            Box::new(m20250101_000002_create_flats_table::Migration),
            Box::new(m20250101_000003_create_tenancies_table::Migration),
            Box::new(m20250101_000004_create_maintenance_table::Migration),
            Box::new(m20250101_000005_create_rental_documents_table::Migration),
            Box::new(m20250101_000006_create_occupied_flats_view::Migration),
            Box::new(m20250101_000007_one_active_tenancy_per_flat::Migration),
        ]
    }
}

mod m20250101_000001_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::DisplayName).string().null())
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Email,
        PasswordHash,
        DisplayName,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000002_create_flats_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_flats_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Flats::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Flats::FlatId)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Flats::ApartmentName).string().not_null())
                        .col(ColumnDef::new(Flats::FlatNumber).string().null())
                        .col(
                            ColumnDef::new(Flats::RentAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Flats::DueDate).date().null())
                        .col(ColumnDef::new(Flats::OwnerEmail).string().not_null())
                        .col(
                            ColumnDef::new(Flats::Status)
                                .string()
                                .not_null()
                                .default("unpaid"),
                        )
                        .col(ColumnDef::new(Flats::PaidOn).date().null())
                        .col(
                            ColumnDef::new(Flats::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Flats::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_flats_owner_email")
                        .table(Flats::Table)
                        .col(Flats::OwnerEmail)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Flats::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Flats {
        Table,
        FlatId,
        ApartmentName,
        FlatNumber,
        RentAmount,
        DueDate,
        OwnerEmail,
        Status,
        PaidOn,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000003_create_tenancies_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_tenancies_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Tenancies::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Tenancies::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Tenancies::FlatId).string().not_null())
                        .col(ColumnDef::new(Tenancies::TenantName).string().not_null())
                        .col(ColumnDef::new(Tenancies::TenantEmail).string().null())
                        .col(ColumnDef::new(Tenancies::PhoneNumber).string().null())
                        .col(ColumnDef::new(Tenancies::Age).integer().null())
                        .col(ColumnDef::new(Tenancies::OccupationType).string().null())
                        .col(ColumnDef::new(Tenancies::CompanyName).string().null())
                        .col(ColumnDef::new(Tenancies::BusinessName).string().null())
                        .col(ColumnDef::new(Tenancies::FamilyStatus).string().null())
                        .col(ColumnDef::new(Tenancies::FamilyMembers).integer().null())
                        .col(ColumnDef::new(Tenancies::ChildrenCount).integer().null())
                        .col(ColumnDef::new(Tenancies::ChildrenAges).json().null())
                        .col(ColumnDef::new(Tenancies::PartnerAadharUrl).string().null())
                        .col(ColumnDef::new(Tenancies::BachelorsCount).integer().null())
                        .col(ColumnDef::new(Tenancies::BachelorsAadharUrls).json().null())
                        .col(ColumnDef::new(Tenancies::Gender).string().null())
                        .col(
                            ColumnDef::new(Tenancies::DepositAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Tenancies::AadharUrl).string().null())
                        .col(ColumnDef::new(Tenancies::PanUrl).string().null())
                        .col(ColumnDef::new(Tenancies::OfferLetterUrl).string().null())
                        .col(ColumnDef::new(Tenancies::StartDate).date().not_null())
                        .col(ColumnDef::new(Tenancies::EndDate).date().null())
                        .col(ColumnDef::new(Tenancies::ReasonForExit).string().null())
                        .col(
                            ColumnDef::new(Tenancies::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Tenancies::PdfUrl).string().null())
                        .col(
                            ColumnDef::new(Tenancies::PdfUploadedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Tenancies::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Tenancies::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_tenancies_flat_id")
                                .from(Tenancies::Table, Tenancies::FlatId)
                                .to(Flats::Table, Flats::FlatId)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_tenancies_flat_active")
                        .table(Tenancies::Table)
                        .col(Tenancies::FlatId)
                        .col(Tenancies::IsActive)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Tenancies::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Flats {
        Table,
        FlatId,
    }

    #[derive(DeriveIden)]
    enum Tenancies {
        Table,
        Id,
        FlatId,
        TenantName,
        TenantEmail,
        PhoneNumber,
        Age,
        OccupationType,
        CompanyName,
        BusinessName,
        FamilyStatus,
        FamilyMembers,
        ChildrenCount,
        ChildrenAges,
        PartnerAadharUrl,
        BachelorsCount,
        BachelorsAadharUrls,
        Gender,
        DepositAmount,
        AadharUrl,
        PanUrl,
        OfferLetterUrl,
        StartDate,
        EndDate,
        ReasonForExit,
        IsActive,
        PdfUrl,
        PdfUploadedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000004_create_maintenance_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_maintenance_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Maintenance::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Maintenance::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Maintenance::FlatId).string().not_null())
                        .col(ColumnDef::new(Maintenance::TenancyId).uuid().null())
                        .col(ColumnDef::new(Maintenance::Category).string().not_null())
                        .col(ColumnDef::new(Maintenance::Description).text().not_null())
                        .col(
                            ColumnDef::new(Maintenance::Severity)
                                .string()
                                .not_null()
                                .default("low"),
                        )
                        .col(
                            ColumnDef::new(Maintenance::Cost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Maintenance::ReportedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Maintenance::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Maintenance::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_maintenance_flat_id")
                                .from(Maintenance::Table, Maintenance::FlatId)
                                .to(Flats::Table, Flats::FlatId)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_maintenance_tenancy_id")
                                .from(Maintenance::Table, Maintenance::TenancyId)
                                .to(Tenancies::Table, Tenancies::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Maintenance::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Flats {
        Table,
        FlatId,
    }

    #[derive(DeriveIden)]
    enum Tenancies {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Maintenance {
        Table,
        Id,
        FlatId,
        TenancyId,
        Category,
        Description,
        Severity,
        Cost,
        ReportedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000005_create_rental_documents_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_rental_documents_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(RentalDocuments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RentalDocuments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(RentalDocuments::FlatId).string().not_null())
                        .col(ColumnDef::new(RentalDocuments::TenantId).uuid().null())
                        .col(ColumnDef::new(RentalDocuments::Type).string().not_null())
                        .col(ColumnDef::new(RentalDocuments::Month).string().null())
                        .col(ColumnDef::new(RentalDocuments::FileUrl).string().not_null())
                        .col(ColumnDef::new(RentalDocuments::UploadedBy).string().not_null())
                        .col(
                            ColumnDef::new(RentalDocuments::UploadedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_rental_documents_flat_id")
                                .from(RentalDocuments::Table, RentalDocuments::FlatId)
                                .to(Flats::Table, Flats::FlatId)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_rental_documents_flat_id")
                        .table(RentalDocuments::Table)
                        .col(RentalDocuments::FlatId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(RentalDocuments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Flats {
        Table,
        FlatId,
    }

    #[derive(DeriveIden)]
    enum RentalDocuments {
        Table,
        Id,
        FlatId,
        TenantId,
        Type,
        Month,
        FileUrl,
        UploadedBy,
        UploadedAt,
    }
}

mod m20250101_000006_create_occupied_flats_view {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000006_create_occupied_flats_view"
        }
    }

    // One row per active tenancy; a flat appears here exactly when it is filled.
    const CREATE_VIEW: &str = r#"
        CREATE VIEW IF NOT EXISTS occupied_flats AS
        SELECT
            t.id AS tenancy_id,
            f.flat_id AS flat_id,
            f.apartment_name AS apartment_name,
            f.flat_number AS flat_number,
            t.tenant_name AS tenant_name
        FROM flats f
        INNER JOIN tenancies t ON t.flat_id = f.flat_id
        WHERE t.is_active = TRUE
    "#;

    const CREATE_VIEW_POSTGRES: &str = r#"
        CREATE OR REPLACE VIEW occupied_flats AS
        SELECT
            t.id AS tenancy_id,
            f.flat_id AS flat_id,
            f.apartment_name AS apartment_name,
            f.flat_number AS flat_number,
            t.tenant_name AS tenant_name
        FROM flats f
        INNER JOIN tenancies t ON t.flat_id = f.flat_id
        WHERE t.is_active = TRUE
    "#;

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let sql = match manager.get_database_backend() {
                sea_orm::DatabaseBackend::Postgres => CREATE_VIEW_POSTGRES,
                _ => CREATE_VIEW,
            };
            manager.get_connection().execute_unprepared(sql).await?;
            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .get_connection()
                .execute_unprepared("DROP VIEW IF EXISTS occupied_flats")
                .await?;
            Ok(())
        }
    }
}

mod m20250101_000007_one_active_tenancy_per_flat {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000007_one_active_tenancy_per_flat"
        }
    }

    const INDEX_NAME: &str = "idx_tenancies_one_active_per_flat";

    // Partial index; sqlite and postgres share the syntax.
    const CREATE_INDEX: &str = r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_tenancies_one_active_per_flat
        ON tenancies (flat_id)
        WHERE is_active = TRUE
    "#;

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager.get_connection().execute_unprepared(CREATE_INDEX).await?;
            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .get_connection()
                .execute_unprepared(&format!("DROP INDEX IF EXISTS {}", INDEX_NAME))
                .await?;
            Ok(())
        }
    }
}

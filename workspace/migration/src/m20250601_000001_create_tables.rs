use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 1. Users
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::UserId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::DisplayName).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::PhotoUrl).string())
                    .col(ColumnDef::new(Users::PaymentMethod).string())
                    .col(ColumnDef::new(Users::PaymentLink).string())
                    .col(timestamp(Users::CreatedAt))
                    .col(timestamp(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // 2. Houses, headed by a user
        manager
            .create_table(
                Table::create()
                    .table(Houses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Houses::HouseId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Houses::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Houses::InviteCode).string().unique_key())
                    .col(ColumnDef::new(Houses::UserId).uuid().not_null())
                    .col(timestamp(Houses::CreatedAt))
                    .col(timestamp(Houses::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-house-head-user")
                            .from(Houses::Table, Houses::UserId)
                            .to(Users::Table, Users::UserId)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 3. House members
        manager
            .create_table(
                Table::create()
                    .table(HouseMembers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HouseMembers::HouseMemberId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(HouseMembers::HouseId).uuid().not_null())
                    .col(ColumnDef::new(HouseMembers::UserId).uuid().not_null())
                    .col(ColumnDef::new(HouseMembers::Nickname).string())
                    .col(
                        ColumnDef::new(HouseMembers::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(HouseMembers::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(timestamp(HouseMembers::CreatedAt))
                    .col(timestamp(HouseMembers::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-house-member-house")
                            .from(HouseMembers::Table, HouseMembers::HouseId)
                            .to(Houses::Table, Houses::HouseId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-house-member-user")
                            .from(HouseMembers::Table, HouseMembers::UserId)
                            .to(Users::Table, Users::UserId)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-house-member-house-user")
                    .table(HouseMembers::Table)
                    .col(HouseMembers::HouseId)
                    .col(HouseMembers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 4. Expenses
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Expenses::ExpenseId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Expenses::HouseId).uuid().not_null())
                    .col(ColumnDef::new(Expenses::PaidBy).uuid())
                    .col(ColumnDef::new(Expenses::Description).string().not_null())
                    .col(ColumnDef::new(Expenses::Category).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Expenses::TotalAmount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::ExpenseDate).date().not_null())
                    .col(
                        ColumnDef::new(Expenses::IsSettled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Expenses::SettledAt).timestamp_with_time_zone())
                    .col(timestamp(Expenses::CreatedAt))
                    .col(timestamp(Expenses::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense-house")
                            .from(Expenses::Table, Expenses::HouseId)
                            .to(Houses::Table, Houses::HouseId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense-paid-by")
                            .from(Expenses::Table, Expenses::PaidBy)
                            .to(HouseMembers::Table, HouseMembers::HouseMemberId)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 5. Expense splits, one per owing member
        manager
            .create_table(
                Table::create()
                    .table(ExpenseSplits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpenseSplits::ExpenseSplitId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExpenseSplits::ExpenseId).uuid().not_null())
                    .col(ColumnDef::new(ExpenseSplits::HouseMemberId).uuid().not_null())
                    .col(
                        ColumnDef::new(ExpenseSplits::AmountOwed)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseSplits::IsPaid)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ExpenseSplits::PaidAt).timestamp_with_time_zone())
                    .col(timestamp(ExpenseSplits::CreatedAt))
                    .col(timestamp(ExpenseSplits::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense-split-expense")
                            .from(ExpenseSplits::Table, ExpenseSplits::ExpenseId)
                            .to(Expenses::Table, Expenses::ExpenseId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense-split-member")
                            .from(ExpenseSplits::Table, ExpenseSplits::HouseMemberId)
                            .to(HouseMembers::Table, HouseMembers::HouseMemberId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense-split-expense-member")
                    .table(ExpenseSplits::Table)
                    .col(ExpenseSplits::ExpenseId)
                    .col(ExpenseSplits::HouseMemberId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 6. Recurring expenses
        manager
            .create_table(
                Table::create()
                    .table(RecurringExpenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecurringExpenses::RecurringExpenseId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RecurringExpenses::HouseId).uuid().not_null())
                    .col(ColumnDef::new(RecurringExpenses::PaidBy).uuid())
                    .col(ColumnDef::new(RecurringExpenses::Description).string().not_null())
                    .col(ColumnDef::new(RecurringExpenses::Category).string_len(50).not_null())
                    .col(
                        ColumnDef::new(RecurringExpenses::Amount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringExpenses::Frequency)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringExpenses::NextDueDate).date().not_null())
                    .col(
                        ColumnDef::new(RecurringExpenses::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(timestamp(RecurringExpenses::CreatedAt))
                    .col(timestamp(RecurringExpenses::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recurring-expense-house")
                            .from(RecurringExpenses::Table, RecurringExpenses::HouseId)
                            .to(Houses::Table, Houses::HouseId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recurring-expense-paid-by")
                            .from(RecurringExpenses::Table, RecurringExpenses::PaidBy)
                            .to(HouseMembers::Table, HouseMembers::HouseMemberId)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 7. Receipts
        manager
            .create_table(
                Table::create()
                    .table(Receipts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Receipts::ReceiptId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Receipts::ExpenseId).uuid().not_null())
                    .col(ColumnDef::new(Receipts::UploadedBy).uuid())
                    .col(ColumnDef::new(Receipts::FileUrl).string().not_null())
                    .col(ColumnDef::new(Receipts::Note).string())
                    .col(timestamp(Receipts::CreatedAt))
                    .col(timestamp(Receipts::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-receipt-expense")
                            .from(Receipts::Table, Receipts::ExpenseId)
                            .to(Expenses::Table, Expenses::ExpenseId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-receipt-uploaded-by")
                            .from(Receipts::Table, Receipts::UploadedBy)
                            .to(HouseMembers::Table, HouseMembers::HouseMemberId)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Children first
        manager
            .drop_table(Table::drop().table(Receipts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RecurringExpenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExpenseSplits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(HouseMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Houses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

fn timestamp<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

#[derive(DeriveIden)]
enum Users {
    Table,
    UserId,
    DisplayName,
    Email,
    PhotoUrl,
    PaymentMethod,
    PaymentLink,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Houses {
    Table,
    HouseId,
    Name,
    InviteCode,
    UserId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum HouseMembers {
    Table,
    HouseMemberId,
    HouseId,
    UserId,
    Nickname,
    IsAdmin,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Expenses {
    Table,
    ExpenseId,
    HouseId,
    PaidBy,
    Description,
    Category,
    TotalAmount,
    ExpenseDate,
    IsSettled,
    SettledAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ExpenseSplits {
    Table,
    ExpenseSplitId,
    ExpenseId,
    HouseMemberId,
    AmountOwed,
    IsPaid,
    PaidAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum RecurringExpenses {
    Table,
    RecurringExpenseId,
    HouseId,
    PaidBy,
    Description,
    Category,
    Amount,
    Frequency,
    NextDueDate,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Receipts {
    Table,
    ReceiptId,
    ExpenseId,
    UploadedBy,
    FileUrl,
    Note,
    CreatedAt,
    UpdatedAt,
}

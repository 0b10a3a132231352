//! Root of the SeaORM entity modules for the shared-household expense data.
//! Every primary key is a service-generated UUID and every timestamp is UTC.

pub mod expense;
pub mod expense_split;
pub mod house;
pub mod house_member;
pub mod receipt;
pub mod recurring_expense;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::expense::Entity as Expense;
    pub use super::expense_split::Entity as ExpenseSplit;
    pub use super::house::Entity as House;
    pub use super::house_member::Entity as HouseMember;
    pub use super::receipt::Entity as Receipt;
    pub use super::recurring_expense::Entity as RecurringExpense;
    pub use super::user::Entity as User;
}

pub mod expense_splits;
pub mod expenses;
pub mod health;
pub mod house_members;
pub mod houses;
pub mod receipts;
pub mod recurring_expenses;
pub mod user_houses;
pub mod users;

//! HTTP-level scenarios run against the full router and an in-memory database.

#[cfg(test)]
mod access;
#[cfg(test)]
mod expenses;
#[cfg(test)]
mod users;

pub mod list_tables;

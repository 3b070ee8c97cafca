pub mod file_record;

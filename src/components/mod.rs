pub mod sticky_notes;

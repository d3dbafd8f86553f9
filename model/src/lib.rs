pub mod scrum_update;

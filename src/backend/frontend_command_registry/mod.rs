mod command_entry;
mod panel_commands;

pub(crate) use command_entry::run;

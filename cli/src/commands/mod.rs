mod helpers;
mod list;
mod recipe;

pub(crate) use list::{cmd_browse, cmd_list};
pub(crate) use recipe::{
    AddArgs, EditArgs, cmd_recipe_add, cmd_recipe_delete, cmd_recipe_edit, cmd_recipe_show,
    cmd_types,
};

//! Default Template Merging
//!
//! Fills the unset fields of a requested [`JobTemplate`] from the workflow's
//! default template.
//!
//! There is no "explicitly unset" marker: a scalar the caller cleared to the
//! empty string is indistinguishable from one never set, and is always taken
//! from the default.

use std::collections::HashMap;

use super::model::JobTemplate;

/// Completes `req` with values from `def`.
///
/// - Empty scalar fields are replaced by the default's value.
/// - `candidate_machines` and `extension_list` are copied from the default
///   only when absent (`None`) on the request; an empty list is kept.
/// - `stage_in_files` and `job_environment` are joined; keys already present
///   in the request win, even when their value is empty.
/// - `args` always stay as requested.
///
/// `def` is only borrowed, and everything taken from it is cloned, so later
/// changes to the result never reach the default.
pub fn merge_with_default(mut req: JobTemplate, def: &JobTemplate) -> JobTemplate {
    fill_if_empty(&mut req.remote_command, &def.remote_command);
    fill_if_empty(&mut req.working_directory, &def.working_directory);
    fill_if_empty(&mut req.job_category, &def.job_category);
    fill_if_empty(&mut req.input_path, &def.input_path);
    fill_if_empty(&mut req.output_path, &def.output_path);
    fill_if_empty(&mut req.error_path, &def.error_path);
    fill_if_empty(&mut req.accounting_id, &def.accounting_id);
    fill_if_empty(&mut req.job_name, &def.job_name);

    // replaces destination machines
    if req.candidate_machines.is_none() {
        req.candidate_machines = def.candidate_machines.clone();
    }
    // replaces extensions
    if req.extension_list.is_none() {
        req.extension_list = def.extension_list.clone();
    }

    merge_string_map(&mut req.stage_in_files, &def.stage_in_files);
    merge_string_map(&mut req.job_environment, &def.job_environment);

    req
}

fn fill_if_empty(dst: &mut String, src: &str) {
    if dst.is_empty() {
        *dst = src.to_string();
    }
}

/// Copies every entry of `src` whose key is missing from `dst`.
fn merge_string_map(dst: &mut HashMap<String, String>, src: &HashMap<String, String>) {
    for (key, value) in src {
        dst.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

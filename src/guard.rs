use crate::params::ParamList;

pub const NULL_DEVICE: &str = "/dev/null";

/// Finds the output parameter that several runs would overwrite.
///
/// Only applies when the tool marks an output option as unsafe and more
/// than one run is being processed. The returned index is rewritten to
/// `<run><extension>` before each run; with `None` the parameter is passed
/// through untouched and all runs share it.
pub fn guard(runs: &[String], unsafe_param: Option<&str>, params: &ParamList) -> Option<usize> {
    let name = unsafe_param.filter(|name| !name.is_empty())?;
    if runs.len() <= 1 {
        return None;
    }
    params.iter().position(|param| {
        param.name == name
            && param
                .value
                .as_deref()
                .is_some_and(|value| value != NULL_DEVICE)
    })
}

pub fn per_run_output(run: &str, extension: &str) -> String {
    format!("{run}{extension}")
}

pub fn unsafe_output_message(runs: &[String], tool: &str, extension: &str) -> String {
    let mut message = format!(
        "You are trying to process {} runs to a single output file, but {tool}\n\
         is not capable of producing valid output from more than one run into a single\n\
         file. The following output files will be created instead:",
        runs.len()
    );
    for run in runs {
        message.push_str("\n\t");
        message.push_str(&per_run_output(run, extension));
    }
    message
}

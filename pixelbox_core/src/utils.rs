use colour::red;

pub fn print_intro() {
    println!(
        r#"
           _          _ _
     _ __ (_)_  _____| | |__   _____  __
    | '_ \| \ \/ / _ \ | '_ \ / _ \ \/ /
    | |_) | |>  <  __/ | |_) | (_) >  <
    | .__/|_/_/\_\___|_|_.__/ \___/_/\_\
    |_|"#
    );

    if cfg!(debug_assertions) {
        red!("\nWARNING: YOU ARE RUNNING IN DEBUG MODE. Quantization is way slower than it should be.\n\n");
    }
}

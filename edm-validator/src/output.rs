//! Console rendering for manual SQL results and table listings.

use validator_lib::QueryOutput;

/// Print one query result: comma-joined column names, then one line per row.
pub fn print_query_output(output: &QueryOutput) {
    if output.columns.is_empty() {
        println!("(no results)");
        return;
    }
    println!("{}", output.columns.join(", "));
    for row in &output.rows {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        println!("{}", cells.join(", "));
    }
}

pub fn print_table_list(tables: &[String]) {
    if tables.is_empty() {
        println!("(no tables loaded)");
        return;
    }
    println!("Tables ({}):", tables.len());
    for table in tables {
        println!("  {}", table);
    }
}

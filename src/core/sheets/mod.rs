pub mod workbook;

pub use workbook::{find_sheet, SheetError, SheetInfo, TabColor, Workbook};

// Library root
// -----------
// The binary (`main.rs`) wires these modules into the terminal front end.
//
// Module responsibilities:
// - `api`: fal queue transport, the polling generation client and image
//   downloads.
// - `credential`, `params`: the API key and the form values.
// - `progress`, `render`, `report`: status line, result display and error
//   messages.
// - `session`: owns all of the above for one run of the program.
// - `ui`, `cli`, `config`, `logging`: terminal surface and plumbing.
pub mod api;
pub mod cli;
pub mod config;
pub mod credential;
pub mod error;
pub mod logging;
pub mod params;
pub mod progress;
pub mod render;
pub mod report;
pub mod session;
pub mod ui;

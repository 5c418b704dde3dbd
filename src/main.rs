#[cfg(not(target_os = "windows"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn main() -> std::process::ExitCode {
    use std::process::Termination;

    match fault_injector_bin::run_app() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(code) => code.report(),
    }
}

//! Build script: compiles the dispatch kernels (.cu) to PTX at build time.
//!
//! With the `cuda` feature enabled, every `.cu` file in `kernels/` is run
//! through `nvcc --ptx` and the output lands in `$OUT_DIR/kernels/`, where
//! the operator wrappers embed it via
//! `include_str!(concat!(env!("OUT_DIR"), "/kernels/<name>.ptx"))`.

fn main() {
    #[cfg(feature = "cuda")]
    cuda::compile_kernels();
}

#[cfg(feature = "cuda")]
mod cuda {
    use std::path::{Path, PathBuf};
    use std::process::Command;
    use std::{env, fs};

    pub fn compile_kernels() {
        let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
        let kernel_dir = manifest_dir.join("kernels");
        let ptx_dir = PathBuf::from(env::var("OUT_DIR").unwrap()).join("kernels");

        fs::create_dir_all(&ptx_dir).expect("Failed to create PTX output directory");

        let mut compiled = 0;
        for entry in fs::read_dir(&kernel_dir).expect("Failed to read kernels/ directory") {
            let path = entry.expect("Failed to read kernels/ entry").path();
            if path.extension().is_some_and(|ext| ext == "cu") {
                compile_cu(&ptx_dir, &path);
                compiled += 1;
            }
        }

        assert!(
            compiled > 0,
            "No .cu files found in {}",
            kernel_dir.display()
        );
    }

    fn compile_cu(ptx_dir: &Path, cu_path: &Path) {
        let stem = cu_path.file_stem().unwrap().to_str().unwrap();
        let ptx_path = ptx_dir.join(format!("{stem}.ptx"));

        println!("cargo:rerun-if-changed={}", cu_path.display());

        let status = Command::new("nvcc")
            .args([
                "--ptx",
                "-o",
                ptx_path.to_str().unwrap(),
                cu_path.to_str().unwrap(),
            ])
            .status()
            .expect("Failed to execute nvcc. Is the CUDA toolkit installed?");

        assert!(
            status.success(),
            "nvcc failed to compile {}",
            cu_path.display()
        );
    }
}

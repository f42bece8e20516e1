use honggfuzz::fuzz;
use ziplode::inspect::read_archive;

fn main() {
    loop {
        fuzz!(|data: &[u8]| {
            let _ = read_archive(data);
        });
    }
}

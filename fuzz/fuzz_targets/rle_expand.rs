use honggfuzz::fuzz;
use ziplode::{pseudo_compress, pseudo_expand};

fn main() {
    loop {
        fuzz!(|data: &[u8]| {
            let _ = pseudo_expand(data);
            let encoded = pseudo_compress(data);
            if !data.contains(&0xFF) {
                assert_eq!(pseudo_expand(&encoded).unwrap(), data);
            }
        });
    }
}

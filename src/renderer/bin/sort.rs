//! Three-way quicksort (Bentley & McIlroy, "Engineering a Sort Function").
//!
//! Atoms sharing a sort key end up adjacent, which is all the bins need;
//! the sort is not stable.

/// Sorts `x` by `key` in place.
pub(crate) fn three_way_sort<T, K: Ord + Copy>(x: &mut [T], key: &impl Fn(&T) -> K) {
    let n = x.len();
    if n < 7 {
        insertion_sort(x, key);
        return;
    }

    let mut m = n / 2;
    if n > 7 {
        let mut l = 0;
        let mut r = n - 1;
        if n > 40 {
            let s = n / 8;
            l = med3(x, key, l, l + s, l + 2 * s);
            m = med3(x, key, m - s, m, m + s);
            r = med3(x, key, r - 2 * s, r - s, r);
        }
        m = med3(x, key, l, m, r);
    }
    let v = key(&x[m]);

    // Invariant: [0, a) == v, [a, b) < v, (c, d] > v, (d, n) == v
    let (mut a, mut b) = (0usize, 0usize);
    let (mut c, mut d) = (n as isize - 1, n as isize - 1);
    loop {
        while (b as isize) <= c && key(&x[b]) <= v {
            if key(&x[b]) == v {
                x.swap(a, b);
                a += 1;
            }
            b += 1;
        }
        while c >= b as isize && key(&x[c as usize]) >= v {
            if key(&x[c as usize]) == v {
                x.swap(c as usize, d as usize);
                d -= 1;
            }
            c -= 1;
        }
        if b as isize > c {
            break;
        }
        x.swap(b, c as usize);
        b += 1;
        c -= 1;
    }

    // Move the equal runs from the ends into the middle.
    let s = a.min(b - a);
    vecswap(x, 0, b - s, s);
    let d = d as usize + 1;
    let c = (c + 1) as usize;
    let s = (d - c).min(n - d);
    vecswap(x, b, n - s, s);

    let less = b - a;
    let greater = d - c;
    if less > 1 {
        three_way_sort(&mut x[..less], key);
    }
    if greater > 1 {
        three_way_sort(&mut x[n - greater..], key);
    }
}

fn insertion_sort<T, K: Ord + Copy>(x: &mut [T], key: &impl Fn(&T) -> K) {
    for i in 1..x.len() {
        let mut j = i;
        while j > 0 && key(&x[j - 1]) > key(&x[j]) {
            x.swap(j, j - 1);
            j -= 1;
        }
    }
}

fn med3<T, K: Ord + Copy>(x: &[T], key: &impl Fn(&T) -> K, a: usize, b: usize, c: usize) -> usize {
    let (ka, kb, kc) = (key(&x[a]), key(&x[b]), key(&x[c]));
    if ka < kb {
        if kb < kc {
            b
        } else if ka < kc {
            c
        } else {
            a
        }
    } else if kb > kc {
        b
    } else if ka > kc {
        c
    } else {
        a
    }
}

/// Swaps `x[a..a + n]` with `x[b..b + n]`.
fn vecswap<T>(x: &mut [T], a: usize, b: usize, n: usize) {
    for i in 0..n {
        x.swap(a + i, b + i);
    }
}

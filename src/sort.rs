// Copyright (c) 2017 Ashley Jeffs
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

//! A partial quicksort over a handle array. Only `[0, survivors)` needs to
//! come out correctly ranked; the rest may be left in any order that still
//! respects the partition boundary. Ties break on handle index, ascending,
//! so that a fixed PRNG seed reproduces a fixed ranking run to run.

/// Subarrays at or below this length fall back to insertion sort.
pub const MIN_QUICKSORT: usize = 20;

/// Sorts `handles` so that, under `sort_max`, `[0, survivors)` holds the
/// best-ranked entries (by `fitness_of(handle)`), with ties broken by handle
/// index ascending. Entries at or beyond `survivors` are left partitioned
/// but not necessarily internally sorted.
pub fn partial_sort_by_fitness<F>(handles: &mut [usize], survivors: usize, sort_max: bool, fitness_of: F)
where
    F: Fn(usize) -> i64,
{
    let len = handles.len();
    if len < 2 {
        return;
    }
    let survivors = survivors.min(len);
    quicksort(handles, 0, len, survivors, sort_max, &fitness_of);
}

/// `true` if `a` should be ordered before `b` under the active sort order.
fn better(a: (i64, usize), b: (i64, usize), sort_max: bool) -> bool {
    let (fa, ha) = a;
    let (fb, hb) = b;
    if fa != fb {
        if sort_max {
            fa > fb
        } else {
            fa < fb
        }
    } else {
        ha < hb
    }
}

fn key(handles: &[usize], i: usize, fitness_of: &dyn Fn(usize) -> i64) -> (i64, usize) {
    let h = handles[i];
    (fitness_of(h), h)
}

fn quicksort(handles: &mut [usize], lo: usize, hi: usize, survivors: usize, sort_max: bool, fitness_of: &dyn Fn(usize) -> i64) {
    if hi - lo < 2 {
        return;
    }
    if hi - lo <= MIN_QUICKSORT {
        insertion_sort(&mut handles[lo..hi], sort_max, fitness_of);
        return;
    }

    let mid = lo + (hi - lo) / 2;
    let pivot_index = median_of_three(handles, lo, mid, hi - 1, sort_max, fitness_of);
    handles.swap(pivot_index, hi - 1);
    let pivot_key = key(handles, hi - 1, fitness_of);

    let mut store = lo;
    for i in lo..hi - 1 {
        if better(key(handles, i, fitness_of), pivot_key, sort_max) {
            handles.swap(i, store);
            store += 1;
        }
    }
    handles.swap(store, hi - 1);

    // Left partition [lo, store) always overlaps the survivor prefix while
    // lo < survivors; it must be fully ordered.
    if lo < survivors && store > lo {
        quicksort(handles, lo, store, survivors, sort_max, fitness_of);
    }
    // Right partition [store+1, hi) only matters if part of it is still
    // inside the survivor prefix; otherwise it's death-eligible and the
    // partition boundary already guarantees invariant 1 without further
    // sorting.
    if store + 1 < survivors && store + 1 < hi {
        quicksort(handles, store + 1, hi, survivors, sort_max, fitness_of);
    }
}

fn median_of_three(handles: &[usize], a: usize, b: usize, c: usize, sort_max: bool, fitness_of: &dyn Fn(usize) -> i64) -> usize {
    let ka = key(handles, a, fitness_of);
    let kb = key(handles, b, fitness_of);
    let kc = key(handles, c, fitness_of);

    if better(ka, kb, sort_max) {
        if better(kb, kc, sort_max) {
            b
        } else if better(ka, kc, sort_max) {
            c
        } else {
            a
        }
    } else if better(ka, kc, sort_max) {
        a
    } else if better(kb, kc, sort_max) {
        c
    } else {
        b
    }
}

fn insertion_sort(handles: &mut [usize], sort_max: bool, fitness_of: &dyn Fn(usize) -> i64) {
    for i in 1..handles.len() {
        let mut j = i;
        while j > 0 && better(key(handles, j, fitness_of), key(handles, j - 1, fitness_of), sort_max) {
            handles.swap(j, j - 1);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_ranked(handles: &[usize], survivors: usize, sort_max: bool, fitness_of: impl Fn(usize) -> i64) -> bool {
        for i in 0..survivors.min(handles.len()) {
            for j in i..handles.len() {
                let (fa, ha) = (fitness_of(handles[i]), handles[i]);
                let (fb, hb) = (fitness_of(handles[j]), handles[j]);
                if fa == fb {
                    if ha > hb && i != j {
                        return false;
                    }
                    continue;
                }
                if sort_max && fa < fb {
                    return false;
                }
                if !sort_max && fa > fb {
                    return false;
                }
            }
        }
        true
    }

    #[test]
    fn sorts_small_array_with_insertion_sort_path() {
        let fitness = vec![5i64, 3, 9, 1, 4];
        let mut handles: Vec<usize> = (0..fitness.len()).collect();
        partial_sort_by_fitness(&mut handles, handles.len(), false, |h| fitness[h]);
        assert!(is_ranked(&handles, handles.len(), false, |h| fitness[h]));
        assert_eq!(handles[0], 3);
    }

    #[test]
    fn sorts_large_array_with_quicksort_path() {
        let fitness: Vec<i64> = (0..500).map(|i| (i * 37 % 501) as i64).collect();
        let mut handles: Vec<usize> = (0..fitness.len()).collect();
        partial_sort_by_fitness(&mut handles, fitness.len(), true, |h| fitness[h]);
        assert!(is_ranked(&handles, fitness.len(), true, |h| fitness[h]));
    }

    #[test]
    fn partial_sort_only_guarantees_survivor_prefix() {
        let fitness: Vec<i64> = (0..200).rev().collect();
        let mut handles: Vec<usize> = (0..fitness.len()).collect();
        let survivors = 50;
        partial_sort_by_fitness(&mut handles, survivors, false, |h| fitness[h]);
        assert!(is_ranked(&handles, survivors, false, |h| fitness[h]));
        // Boundary property: every survivor <= every death-eligible entry.
        let worst_survivor = fitness[handles[survivors - 1]];
        for &h in &handles[survivors..] {
            assert!(worst_survivor <= fitness[h]);
        }
    }

    #[test]
    fn ties_break_on_handle_index() {
        let fitness = vec![0i64; 10];
        let mut handles: Vec<usize> = (0..fitness.len()).collect();
        partial_sort_by_fitness(&mut handles, handles.len(), false, |h| fitness[h]);
        assert_eq!(handles, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn deterministic_for_fixed_input() {
        let fitness: Vec<i64> = (0..300).map(|i| (i * 131 % 977) as i64).collect();
        let mut a: Vec<usize> = (0..fitness.len()).collect();
        let mut b: Vec<usize> = (0..fitness.len()).collect();
        partial_sort_by_fitness(&mut a, fitness.len(), false, |h| fitness[h]);
        partial_sort_by_fitness(&mut b, fitness.len(), false, |h| fitness[h]);
        assert_eq!(a, b);
    }
}

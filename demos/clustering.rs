//! DBSCAN on a small 2D dataset: flat-buffer API and row-oriented API.

use dbgrid::{Clustering, Dbscan, NOISE, NOISE_ID};

fn main() {
    // Three well-separated clusters in 2D, plus one outlier.
    let data: Vec<Vec<f32>> = vec![
        // Cluster A (near origin)
        vec![0.0, 0.0],
        vec![0.1, 0.2],
        vec![0.2, 0.1],
        vec![-0.1, 0.1],
        // Cluster B (near (5, 5))
        vec![5.0, 5.0],
        vec![5.1, 4.9],
        vec![4.9, 5.1],
        vec![5.2, 5.2],
        // Cluster C (near (10, 0))
        vec![10.0, 0.0],
        vec![10.1, 0.1],
        vec![9.9, -0.1],
        vec![10.2, 0.2],
        // Outlier
        vec![20.0, 20.0],
    ];

    // --- Row-oriented API (eps=1.0, min_pts=2) ---
    let dbscan = Dbscan::new(1.0, 2);
    let labels = dbscan.fit_predict(&data).unwrap();
    println!("=== DBSCAN rows (eps=1.0, min_pts=2) ===");
    for (i, label) in labels.iter().enumerate() {
        let tag = if *label == NOISE {
            "NOISE".to_string()
        } else {
            format!("cluster {}", label)
        };
        println!("  point {:2} ({:5.1}, {:5.1}) => {}", i, data[i][0], data[i][1], tag);
    }

    // --- Flat buffer API, core flags included, on a 4-thread pool ---
    let flat: Vec<f64> = data.iter().flatten().map(|&x| f64::from(x)).collect();
    let out = Dbscan::new(0.3, 3)
        .with_threads(4)
        .fit(&flat, 2, data.len())
        .unwrap();
    println!(
        "\n=== DBSCAN flat (eps=0.3, min_pts=3): {} clusters ===",
        out.n_clusters
    );
    for i in 0..out.len() {
        let kind = if out.core[i] {
            "core"
        } else if out.labels[i] == NOISE_ID {
            "noise"
        } else {
            "border"
        };
        println!("  point {:2} => {:3} ({})", i, out.labels[i], kind);
    }
}
